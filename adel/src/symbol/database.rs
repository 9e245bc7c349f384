//! Reference leaf shapes, keyed by leaf rank
use crate::{Error, plantgen::linspace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A reference leaf: midrib coordinates and half-width profile
///
/// All four vectors have the same length.  `s` is the normalized curvilinear
/// abscissa along the midrib, strictly increasing from 0 (ligule) to 1 (tip),
/// and `r` is the half-width relative to the maximum, in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafShape {
    /// Midrib X coordinates
    pub x: Vec<f64>,
    /// Midrib Y coordinates (Y is vertical)
    pub y: Vec<f64>,
    /// Normalized curvilinear abscissa
    pub s: Vec<f64>,
    /// Relative half-width
    pub r: Vec<f64>,
}

impl LeafShape {
    /// Builds a shape from its midrib and width profile, computing `s` from
    /// the midrib arc length
    pub fn from_midrib(x: Vec<f64>, y: Vec<f64>, r: Vec<f64>) -> Self {
        let mut s = Vec::with_capacity(x.len());
        let mut total = 0.0;
        for i in 0..x.len().min(y.len()) {
            if i > 0 {
                total += (x[i] - x[i - 1]).hypot(y[i] - y[i - 1]);
            }
            s.push(total);
        }
        if total > 0.0 {
            s.iter_mut().for_each(|v| *v /= total);
        }
        Self { x, y, s, r }
    }

    /// Number of midrib points
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Checks whether the shape has no points
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Checks the shape for consistency; `rank` is only used for reporting
    pub fn validate(&self, rank: u32) -> Result<(), Error> {
        let n = self.x.len();
        if self.y.len() != n || self.s.len() != n || self.r.len() != n {
            return Err(Error::BadShape(rank, "coordinate arrays differ in length"));
        }
        if n < 2 {
            return Err(Error::BadShape(rank, "fewer than 2 points"));
        }
        if self.s.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(Error::BadShape(rank, "abscissa is not strictly increasing"));
        }
        if self.s[0] != 0.0 || self.s[n - 1] != 1.0 {
            return Err(Error::BadShape(rank, "abscissa does not span [0, 1]"));
        }
        if self.r.iter().any(|r| !(0.0..=1.0).contains(r)) {
            return Err(Error::BadShape(rank, "relative width outside of [0, 1]"));
        }
        if self.x.iter().chain(&self.y).any(|v| !v.is_finite()) {
            return Err(Error::BadShape(rank, "non-finite coordinate"));
        }
        Ok(())
    }

    /// Angle of the first midrib segment from the vertical, in radians
    pub fn initial_angle(&self) -> f64 {
        let dx = self.x[1] - self.x[0];
        let dy = self.y[1] - self.y[0];
        dx.atan2(dy).abs()
    }

    /// Returns this shape rotated by `angle` (counter-clockwise) about its
    /// first midrib point
    pub fn rotated(&self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        let (x0, y0) = (self.x[0], self.y[0]);
        let (x, y) = self
            .x
            .iter()
            .zip(&self.y)
            .map(|(x, y)| {
                let (dx, dy) = (x - x0, y - y0);
                (x0 + cos * dx - sin * dy, y0 + sin * dx + cos * dy)
            })
            .unzip();
        Self {
            x,
            y,
            s: self.s.clone(),
            r: self.r.clone(),
        }
    }

    /// Arc length of the midrib
    pub fn arc_length(&self) -> f64 {
        self.x
            .windows(2)
            .zip(self.y.windows(2))
            .map(|(x, y)| (x[1] - x[0]).hypot(y[1] - y[0]))
            .sum()
    }
}

/// Candidate leaf shapes, keyed by leaf rank
///
/// The database is read-only once built, and may be shared freely between
/// threads.  It serializes as a plain map from rank to shape list, and every
/// shape is validated on deserialization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<u32, Vec<LeafShape>>",
    into = "BTreeMap<u32, Vec<LeafShape>>"
)]
pub struct LeafShapeDatabase {
    shapes: BTreeMap<u32, Vec<LeafShape>>,
}

impl TryFrom<BTreeMap<u32, Vec<LeafShape>>> for LeafShapeDatabase {
    type Error = Error;
    fn try_from(shapes: BTreeMap<u32, Vec<LeafShape>>) -> Result<Self, Error> {
        Self::from_map(shapes)
    }
}

impl From<LeafShapeDatabase> for BTreeMap<u32, Vec<LeafShape>> {
    fn from(db: LeafShapeDatabase) -> Self {
        db.shapes
    }
}

impl LeafShapeDatabase {
    /// Builds an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a database from a map, validating every shape
    pub fn from_map(shapes: BTreeMap<u32, Vec<LeafShape>>) -> Result<Self, Error> {
        let out = Self { shapes };
        out.validate()?;
        Ok(out)
    }

    /// Checks every shape of the database
    pub fn validate(&self) -> Result<(), Error> {
        for (rank, list) in &self.shapes {
            for s in list {
                s.validate(*rank)?;
            }
        }
        Ok(())
    }

    /// Adds a candidate shape for the given rank
    pub fn insert(&mut self, rank: u32, shape: LeafShape) -> Result<(), Error> {
        shape.validate(rank)?;
        self.shapes.entry(rank).or_default().push(shape);
        Ok(())
    }

    /// Ranks present in the database, in increasing order
    pub fn ranks(&self) -> Vec<u32> {
        self.shapes.keys().cloned().collect()
    }

    /// Highest rank in the database
    pub fn max_rank(&self) -> Option<u32> {
        self.shapes.keys().next_back().cloned()
    }

    /// Checks whether the database holds no ranks
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Finds the candidate shapes for a leaf rank
    ///
    /// The rank is first clamped to [`max_rank`](Self::max_rank).  Lookup then
    /// tries that rank, then `rank + 1`, then `rank - 1`, and stops at the
    /// first key present.  Returns the rank that was used and its shapes.
    pub fn lookup(&self, rank: u32) -> Result<(u32, &[LeafShape]), Error> {
        let max = self.max_rank().ok_or(Error::EmptyDatabase)?;
        let rank = rank.min(max);
        let found = [Some(rank), rank.checked_add(1), rank.checked_sub(1)]
            .into_iter()
            .flatten()
            .find_map(|r| self.shapes.get(&r).map(|list| (r, list)));
        match found {
            Some((r, list)) if !list.is_empty() => Ok((r, list.as_slice())),
            _ => Err(Error::ShapeNotFound {
                rank,
                available: self.ranks(),
            }),
        }
    }

    /// Builds a small synthetic database, with three shapes for each of the
    /// ranks 1 to 6
    ///
    /// Leaves get longer and more curved with their rank; this is enough for
    /// demos and tests, but is not calibrated on any measurement.
    pub fn sample() -> Self {
        let mut shapes = BTreeMap::new();
        for rank in 1..=6u32 {
            let list = (0..3)
                .map(|variant| {
                    let bend = 0.6 + 0.25 * variant as f64 + 0.15 * rank as f64;
                    let start = 0.15 + 0.05 * rank as f64;
                    sample_shape(start, bend)
                })
                .collect();
            shapes.insert(rank, list);
        }
        Self { shapes }
    }
}

/// Midrib starting at `start` radians from the vertical, with its tangent
/// turning by `bend` radians along the leaf
fn sample_shape(start: f64, bend: f64) -> LeafShape {
    const POINTS: usize = 21;
    let t = linspace(0.0, 1.0, POINTS);
    let ds = 1.0 / (POINTS - 1) as f64;
    let (mut x, mut y) = (vec![0.0], vec![0.0]);
    for w in t.windows(2) {
        let theta = start + bend * (w[0] + w[1]) / 2.0;
        x.push(x[x.len() - 1] + theta.sin() * ds);
        y.push(y[y.len() - 1] + theta.cos() * ds);
    }
    // Widest a third of the way to the tip, pointed at the tip
    let r = t
        .iter()
        .map(|t| ((0.5 + t - 1.5 * t * t) * 1.5).clamp(0.0, 1.0))
        .collect();
    LeafShape::from_midrib(x, y, r)
}
