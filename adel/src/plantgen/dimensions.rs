//! Organ dimensions of every axis, derived from the reference main stem
use crate::{
    Error,
    params::{
        K1, K2, LENGTHS_REDUCTION_FACTOR, SLOPE_SHIFT_MS_TO_TILLERS,
        TILLERS_L_BLADE_1ST, W_INTERNODE_POLYNOMIAL, WIDTHS_REDUCTION_FACTOR,
    },
    plantgen::{Axis, Spline},
};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Final dimensions of the organs of one phytomer (cm)
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct DimensionRecord {
    pub l_blade: f64,
    pub w_blade: f64,
    pub l_sheath: f64,
    pub w_sheath: f64,
    pub l_internode: f64,
    pub w_internode: f64,
}

impl DimensionRecord {
    fn to_array(self) -> [f64; 6] {
        [
            self.l_blade,
            self.w_blade,
            self.l_sheath,
            self.w_sheath,
            self.l_internode,
            self.w_internode,
        ]
    }

    fn from_array(a: [f64; 6]) -> Self {
        let [l_blade, w_blade, l_sheath, w_sheath, l_internode, w_internode] = a;
        Self {
            l_blade,
            w_blade,
            l_sheath,
            w_sheath,
            l_internode,
            w_internode,
        }
    }

    /// Checks that every dimension is finite and non-negative
    pub fn validate(&self) -> Result<(), Error> {
        const NAMES: [&str; 6] = [
            "l_blade",
            "w_blade",
            "l_sheath",
            "w_sheath",
            "l_internode",
            "w_internode",
        ];
        for (name, v) in NAMES.iter().zip(self.to_array()) {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::BadParameter(*name, v));
            }
        }
        Ok(())
    }

    /// Scales lengths and widths separately
    pub fn scaled(&self, lengths: f64, widths: f64) -> Self {
        Self {
            l_blade: self.l_blade * lengths,
            w_blade: self.w_blade * widths,
            l_sheath: self.l_sheath * lengths,
            w_sheath: self.w_sheath * widths,
            l_internode: self.l_internode * lengths,
            w_internode: self.w_internode * widths,
        }
    }

    fn clamped(self) -> Self {
        Self::from_array(self.to_array().map(|v| v.max(0.0)))
    }
}

/// Index on the main stem that corresponds to phytomer `index` of a tiller
///
/// Tiller leaves resemble higher main stem leaves, with a shift proportional
/// to the tiller's [cohort number](crate::plantgen::AxisPosition::cohort_number).
/// Main stems do not go through this shift.
pub fn relative_index(index: u32, cohort_number: u32) -> f64 {
    index as f64 - SLOPE_SHIFT_MS_TO_TILLERS * cohort_number as f64
}

/// Organ dimensions of the most frequent main stem, and the curves through
/// them
#[derive(Clone, Debug)]
pub struct DimensionModel {
    reference: Vec<DimensionRecord>,
    splines: Vec<Spline>,
    max_w_internode: f64,
}

impl DimensionModel {
    /// Builds a model from the per-phytomer records of the reference main stem
    pub fn new(reference: &[DimensionRecord]) -> Result<Self, Error> {
        if reference.is_empty() {
            return Err(Error::MissingParameter("dimensions"));
        }
        for r in reference {
            r.validate()?;
        }
        let xs: Vec<f64> = (1..=reference.len()).map(|i| i as f64).collect();
        let splines = (0..6)
            .map(|f| {
                let ys: Vec<f64> =
                    reference.iter().map(|r| r.to_array()[f]).collect();
                Spline::new(&xs, &ys)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let max_w_internode = reference
            .iter()
            .map(|r| OrderedFloat(r.w_internode))
            .max()
            .map(|v| v.0)
            .unwrap_or(0.0);
        Ok(Self {
            reference: reference.to_vec(),
            splines,
            max_w_internode,
        })
    }

    /// Number of phytomers on the reference main stem
    pub fn n_reference(&self) -> u32 {
        self.reference.len() as u32
    }

    /// Reference records, starting at phytomer 1
    pub fn reference(&self) -> &[DimensionRecord] {
        &self.reference
    }

    /// Interpolates the reference records at a (fractional) phytomer index
    pub fn at(&self, x: f64) -> DimensionRecord {
        let mut out = [0.0; 6];
        for (o, s) in out.iter_mut().zip(&self.splines) {
            *o = s.eval(x);
        }
        DimensionRecord::from_array(out).clamped()
    }

    /// Main stem phytomer whose dimensions a regressive tiller phytomer copies
    pub fn matched_phytomer(&self, index: u32, cohort_number: u32) -> u32 {
        let r = relative_index(index, cohort_number).round().max(1.0) as u32;
        r.min(self.n_reference())
    }

    /// Derives the dimensions of every phytomer of `axis`
    ///
    /// See [`derive_dimensions`] for details.
    pub fn derive_dimensions(&self, axis: &Axis) -> BTreeMap<u32, DimensionRecord> {
        let n = axis.n_phytomer;
        let n_ref = self.n_reference();
        if axis.is_main_stem() {
            if n == n_ref {
                return (1..=n).zip(self.reference.iter().cloned()).collect();
            }
            let stretch = if n > 1 {
                (n_ref - 1) as f64 / (n - 1) as f64
            } else {
                0.0
            };
            return (1..=n)
                .map(|i| (i, self.at(1.0 + (i - 1) as f64 * stretch)))
                .collect();
        }

        let cohort = axis.cohort_number();
        if axis.regressive {
            let lengths = 1.0 + LENGTHS_REDUCTION_FACTOR;
            let widths = 1.0 + WIDTHS_REDUCTION_FACTOR;
            return (1..=n)
                .map(|i| {
                    let m = self.matched_phytomer(i, cohort);
                    let r = self.reference[(m - 1) as usize];
                    (i, r.scaled(lengths, widths))
                })
                .collect();
        }

        (1..=n)
            .map(|i| {
                let rel = relative_index(i, cohort);
                // Proportional factor, from the first to the last leaf
                let k = if n > 1 {
                    K1 + (K2 - K1) * (i - 1) as f64 / (n - 1) as f64
                } else {
                    K1
                };
                let base = self.at(rel);
                let mut d = base.scaled(k, k);
                if i == 1 {
                    d.l_blade = TILLERS_L_BLADE_1ST;
                }
                d.w_internode = W_INTERNODE_POLYNOMIAL.eval(rel / n_ref as f64)
                    * self.max_w_internode;
                (i, d.clamped())
            })
            .collect()
    }
}

/// Derives the organ dimensions of every phytomer of `axis`
///
/// - The most frequent main stem uses the reference records as-is; main stems
///   with another leaf number re-sample the reference curves so that their
///   first and last phytomers match the reference ones.
/// - Non-regressive tillers sample the reference curves at their
///   [`relative_index`], scaled by a factor going from [`K1`] on the first
///   leaf to [`K2`] on the last.  The first blade is
///   [`TILLERS_L_BLADE_1ST`] long, and internode widths follow
///   [`W_INTERNODE_POLYNOMIAL`].
/// - Regressive tillers copy the matched main stem phytomer, reduced by
///   [`LENGTHS_REDUCTION_FACTOR`] and [`WIDTHS_REDUCTION_FACTOR`].
pub fn derive_dimensions(
    axis: &Axis,
    model: &DimensionModel,
) -> BTreeMap<u32, DimensionRecord> {
    model.derive_dimensions(axis)
}
