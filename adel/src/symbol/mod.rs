//! Geometric symbols: turning organ dimensions into meshes
//!
//! [`Symbols`] builds an [`Organ`] from an [`OrganSpec`], which is either a
//! leaf blade (fitted from a reference shape in a [`LeafShapeDatabase`]) or a
//! stem element (a tapered cylinder).
//!
//! Random draws go through an explicit generator handle, which is reseeded
//! before each leaf; two calls with the same seed and database produce the
//! same organ.
//!
//! ```
//! use adel::symbol::{AngleMode, LeafShapeDatabase, LeafSpec, Symbols};
//! use rand::{SeedableRng, rngs::StdRng};
//!
//! let db = LeafShapeDatabase::sample();
//! let symbols = Symbols::new(&db);
//! let mut rng = StdRng::seed_from_u64(0);
//! let leaf = LeafSpec {
//!     tissue_type: 1,
//!     final_length: 20.0,
//!     length: 15.0,
//!     radius_max: 0.6,
//!     s_base: 0.0,
//!     s_top: 1.0,
//!     leaf_rank: 4,
//!     seed: 1,
//!     insertion_angle: None,
//!     shape_index: None,
//! };
//! let organ = symbols.build_leaf(&mut rng, &leaf)?;
//! assert!(organ.geometry.is_some());
//! assert_eq!(organ.label.leaf_id, 4);
//! # Ok::<(), adel::Error>(())
//! ```
use crate::Error;
use log::trace;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

mod database;
mod fitting;
mod mesh;
mod stem;

pub use database::{LeafShape, LeafShapeDatabase};
pub use fitting::fit_leaf;
pub use mesh::Mesh;
pub use stem::{STEM_SLICES, slim_cylinder, tapered_cylinder};

/// Stem elements shorter than this get no mesh
pub const MIN_STEM_LENGTH: f64 = 1e-6;

/// Labels are built from leaf ranks modulo this value
const MAX_LEAF_ID: u32 = 999;

/// Kind of organ produced by a [`Symbols`] builder
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, strum::Display, Serialize, Deserialize,
)]
pub enum OrganKind {
    /// Leaf blade
    Leaf,
    /// Sheath or internode
    Stem,
}

/// Canopy label of an organ
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Leaf rank, in `[1, 999]` for leaves and 0 for stems
    pub leaf_id: u32,
    /// Optical species, 1 or 2
    pub optical_id: u8,
}

/// A generated organ
#[derive(Clone, Debug, PartialEq)]
pub struct Organ {
    /// Leaf or stem
    pub kind: OrganKind,
    /// Tissue type code, in `1..=12`
    pub tissue_type: i32,
    /// Mesh, or `None` for degenerate organs
    pub geometry: Option<Mesh>,
    /// Canopy label
    pub label: Label,
}

/// Returns the optical species of a tissue type
///
/// Odd codes (1, 3, ..., 11) are optical species 1 and even codes (2, 4,
/// ..., 12) are species 2.  Anything else is rejected.
pub fn optical(tissue_type: i32) -> Result<u8, Error> {
    match tissue_type {
        1..=12 if tissue_type % 2 == 1 => Ok(1),
        1..=12 => Ok(2),
        _ => Err(Error::BadTissueType(tissue_type)),
    }
}

/// How a leaf insertion angle is interpreted
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
)]
pub enum AngleMode {
    /// Fraction of the reference shape's initial angle, capped at π
    #[default]
    Relative,
    /// Angle from the vertical, in degrees
    Absolute,
}

/// Inputs of [`Symbols::build_leaf`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafSpec {
    /// Tissue type code
    pub tissue_type: i32,
    /// Length of the fully grown blade
    pub final_length: f64,
    /// Current visible length
    pub length: f64,
    /// Maximal half-width of the blade
    pub radius_max: f64,
    /// Start of the meshed window, as a fraction of the current length
    pub s_base: f64,
    /// End of the meshed window, as a fraction of the current length
    pub s_top: f64,
    /// Rank of the leaf on its axis
    pub leaf_rank: u32,
    /// Seed used when the builder has none
    pub seed: u64,
    /// Optional insertion angle; negative values are ignored
    pub insertion_angle: Option<f64>,
    /// Optional 1-based index into the candidate shapes; if absent, a shape
    /// is drawn at random
    pub shape_index: Option<usize>,
}

/// Inputs of [`Symbols::build_stem`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct StemSpec {
    pub tissue_type: i32,
    pub length: f64,
    pub diameter_base: f64,
    pub diameter_top: f64,
}

/// Inputs of [`Symbols::build`]
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum OrganSpec {
    Leaf(LeafSpec),
    Stem(StemSpec),
}

/// Organ builder, sharing a read-only shape database
#[derive(Copy, Clone, Debug)]
pub struct Symbols<'a> {
    /// Reference leaf shapes
    pub database: &'a LeafShapeDatabase,
    /// Seed overriding the per-call seed of every leaf
    ///
    /// This also selects the exact stem tessellation.
    pub seed: Option<u64>,
    /// Interpretation of leaf insertion angles
    pub angle_mode: AngleMode,
    /// Always use the exact stem tessellation
    pub classic: bool,
}

impl<'a> Symbols<'a> {
    /// Builds a new set of symbols, without a fixed seed
    pub fn new(database: &'a LeafShapeDatabase) -> Self {
        Self {
            database,
            seed: None,
            angle_mode: AngleMode::Relative,
            classic: false,
        }
    }

    /// Builds an organ of either kind
    pub fn build(&self, rng: &mut StdRng, spec: &OrganSpec) -> Result<Organ, Error> {
        match spec {
            OrganSpec::Leaf(s) => self.build_leaf(rng, s),
            OrganSpec::Stem(s) => self.build_stem(s),
        }
    }

    /// Builds a leaf blade
    ///
    /// `rng` is reseeded with the builder seed if there is one, and with
    /// `spec.seed` otherwise.  Fails if the database has no shape for the
    /// rank (or its neighbors), if `shape_index` is out of range, or if the
    /// tissue type is invalid.
    pub fn build_leaf(
        &self,
        rng: &mut StdRng,
        spec: &LeafSpec,
    ) -> Result<Organ, Error> {
        let optical_id = optical(spec.tissue_type)?;
        let leaf_id = (spec.leaf_rank % MAX_LEAF_ID).max(1);

        let (rank, shapes) = self.database.lookup(leaf_id)?;
        *rng = StdRng::seed_from_u64(self.seed.unwrap_or(spec.seed));
        let i = match spec.shape_index {
            Some(index) if index >= 1 && index <= shapes.len() => index - 1,
            Some(index) => {
                return Err(Error::BadShapeIndex {
                    index,
                    rank,
                    count: shapes.len(),
                });
            }
            None => rng.gen_range(0..shapes.len()),
        };
        trace!("leaf rank {leaf_id} uses shape {} of rank {rank}", i + 1);

        let shape = &shapes[i];
        let geometry = match spec.insertion_angle.filter(|a| *a >= 0.0) {
            Some(angle) => {
                let initial = shape.initial_angle();
                let target = match self.angle_mode {
                    AngleMode::Relative => {
                        (angle * initial).min(std::f64::consts::PI)
                    }
                    AngleMode::Absolute => angle.to_radians(),
                };
                fit_leaf(
                    &shape.rotated(initial - target),
                    spec.final_length,
                    spec.length,
                    spec.s_base,
                    spec.s_top,
                    spec.radius_max,
                )
            }
            None => fit_leaf(
                shape,
                spec.final_length,
                spec.length,
                spec.s_base,
                spec.s_top,
                spec.radius_max,
            ),
        };

        Ok(Organ {
            kind: OrganKind::Leaf,
            tissue_type: spec.tissue_type,
            geometry,
            label: Label {
                leaf_id,
                optical_id,
            },
        })
    }

    /// Builds a stem element (sheath or internode)
    ///
    /// With a builder seed or the `classic` flag, this is a solid
    /// [`tapered_cylinder`]; otherwise it is a [`slim_cylinder`].  Elements
    /// shorter than [`MIN_STEM_LENGTH`] get no mesh.
    pub fn build_stem(&self, spec: &StemSpec) -> Result<Organ, Error> {
        let optical_id = optical(spec.tissue_type)?;
        let geometry = (spec.length >= MIN_STEM_LENGTH).then(|| {
            let (l, rb, rt) = (
                spec.length as f32,
                spec.diameter_base as f32 / 2.0,
                spec.diameter_top as f32 / 2.0,
            );
            if self.seed.is_some() || self.classic {
                tapered_cylinder(l, rb, rt, STEM_SLICES, true)
            } else {
                slim_cylinder(l, rb, rt)
            }
        });
        Ok(Organ {
            kind: OrganKind::Stem,
            tissue_type: spec.tissue_type,
            geometry,
            label: Label {
                leaf_id: 0,
                optical_id,
            },
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn optical_species() {
        for t in [1, 3, 5, 7, 9, 11] {
            assert_eq!(optical(t).unwrap(), 1);
        }
        for t in [2, 4, 6, 8, 10, 12] {
            assert_eq!(optical(t).unwrap(), 2);
        }
        for t in [-1, 0, 13, 100] {
            assert!(matches!(optical(t), Err(Error::BadTissueType(v)) if v == t));
        }
    }

    #[test]
    fn organ_kind_names() {
        assert_eq!(OrganKind::Leaf.to_string(), "Leaf");
        assert_eq!(OrganKind::Stem.to_string(), "Stem");
    }
}
