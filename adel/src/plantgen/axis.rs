//! Axis identities: botanical positions, cohorts and composite codes
use crate::params::{FIRST_CHILD_DELAY, MS_HS_AT_TILLER_EMERGENCE};
use serde::{Deserialize, Serialize};

/// Botanical position of an axis on its plant
///
/// The main stem has an empty path; a tiller is the path of child slots from
/// the main stem, so `T1` is `[1]` and `T1.0` is `[1, 0]`.
///
/// Positions are ordered by emergence, i.e. by cohort then by path.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct AxisPosition(Vec<u32>);

impl AxisPosition {
    /// Returns the main stem position
    pub fn main_stem() -> Self {
        Self(vec![])
    }

    /// Returns the primary tiller `T{i}`
    pub fn primary(i: u32) -> Self {
        Self(vec![i])
    }

    /// Returns the child of this axis in slot `j`
    pub fn child(&self, j: u32) -> Self {
        let mut path = self.0.clone();
        path.push(j);
        Self(path)
    }

    /// Checks whether this is the main stem
    pub fn is_main_stem(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the slots from the main stem to this axis
    pub fn path(&self) -> &[u32] {
        &self.0
    }

    /// Returns the cohort of this position
    ///
    /// The main stem is cohort 0; the child in slot `j` of a cohort `c` axis
    /// belongs to cohort `c + FIRST_CHILD_DELAY + j`.
    pub fn cohort(&self) -> u32 {
        self.0.iter().fold(0, |c, j| c + FIRST_CHILD_DELAY + j)
    }

    /// Returns the cohort number used by the leaf number and phytomer shift
    /// calibrations, which count the main stem as cohort 1
    ///
    /// This is always `cohort() + 1`: `T0` is 3 and `T1` is 4.
    pub fn cohort_number(&self) -> u32 {
        self.cohort() + 1
    }

    /// Returns the offset of this position's cohort in
    /// [`MS_HS_AT_TILLER_EMERGENCE`], or `None` for the main stem and for
    /// cohorts past the end of the table
    pub fn cohort_offset(&self) -> Option<usize> {
        if self.is_main_stem() {
            return None;
        }
        let i = (self.cohort() - FIRST_CHILD_DELAY) as usize;
        (i < MS_HS_AT_TILLER_EMERGENCE.len()).then_some(i)
    }
}

impl Ord for AxisPosition {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.cohort()
            .cmp(&other.cohort())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for AxisPosition {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Prints `MS` for the main stem, otherwise the `T`-notation (e.g. `T1.0`)
impl std::fmt::Display for AxisPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "MS");
        }
        write!(f, "T")?;
        for (i, j) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{j}")?;
        }
        Ok(())
    }
}

/// A type of axis in the population, with its number of instances
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Botanical position
    pub position: AxisPosition,

    /// Potential number of phytomers (final leaf number)
    pub n_phytomer: u32,

    /// Regressive axes stop growing and die before producing an ear
    pub regressive: bool,

    /// Number of instances of this axis in the population
    pub cardinality: u32,

    /// Probability that a plant carries this axis
    pub probability: f64,
}

impl Axis {
    /// Returns the axis cohort (0 for the main stem)
    pub fn cohort(&self) -> u32 {
        self.position.cohort()
    }

    /// Returns the calibration cohort number (1 for the main stem)
    pub fn cohort_number(&self) -> u32 {
        self.position.cohort_number()
    }

    /// Checks whether this is a main stem
    pub fn is_main_stem(&self) -> bool {
        self.position.is_main_stem()
    }

    /// Returns the composite phenology / dimension code
    ///
    /// This is `cohort * 1000 + n_phytomer * 10 + flag`, with `flag` being 1
    /// for non-regressive axes and 0 for regressive ones, so that axes which
    /// share a cohort, phytomer count and fate share a code.
    ///
    /// ```
    /// # use adel::plantgen::{Axis, AxisPosition};
    /// let t1 = Axis {
    ///     position: AxisPosition::primary(1),
    ///     n_phytomer: 9,
    ///     regressive: true,
    ///     cardinality: 3,
    ///     probability: 0.9,
    /// };
    /// assert_eq!(t1.id_phen(), 3090);
    /// ```
    pub fn id_phen(&self) -> u32 {
        self.cohort() * 1000 + self.n_phytomer * 10 + u32::from(!self.regressive)
    }
}
