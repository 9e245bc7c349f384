//! ADEL is an architectural model of leaf development for wheat canopies.
//!
//! It turns a handful of statistical and phenological parameters of a stand
//! (plant density, tillering probabilities, leaf dimensions, green leaf
//! counts) into a description of every axis of every plant over thermal time,
//! and then into 3D organs suitable for light interception or visualization
//! studies.
//!
//! # Plant generation
//! The [`plantgen`] module derives, from a
//! [`PlantgenConfig`](crate::plantgen::PlantgenConfig):
//!
//! - the **axis population**: which tillers emerge on how many plants, and
//!   which of them are **regressive** (they die before heading)
//! - a **phenology curve** per axis type: Haun stage, green leaf number and
//!   senescence index as functions of thermal time
//! - the **dimensions** of every organ of every phytomer
//!
//! Every derivation starts from the most frequent main stem, then shifts and
//! scales it for the other axes; the constants involved live in [`params`].
//!
//! # Geometry
//! The [`symbol`] module builds meshes: leaf blades are fitted from reference
//! midrib shapes in a [`LeafShapeDatabase`](crate::symbol::LeafShapeDatabase),
//! and stem elements are tapered cylinders.
//!
//! # Putting it together
//! A [`Canopy`](crate::canopy::Canopy) runs the whole pipeline, and produces
//! every organ of the stand at a given thermal time:
//!
//! ```
//! use adel::{
//!     canopy::{Canopy, CanopySettings},
//!     plantgen::PlantgenConfig,
//!     symbol::{LeafShapeDatabase, Mesh},
//! };
//!
//! let db = LeafShapeDatabase::sample();
//! let cfg = PlantgenConfig {
//!     plants_number: 4,
//!     ..PlantgenConfig::default()
//! };
//! let canopy = Canopy::new(cfg, &db, CanopySettings::default())?;
//!
//! let mut scene = Mesh::new();
//! for o in canopy.organs_at(1000.0, 0)? {
//!     if let Some(g) = &o.organ.geometry {
//!         scene.extend(&g.transformed(&o.placement));
//!     }
//! }
//! assert!(scene.area() > 0.0);
//!
//! let mut stl = vec![];
//! scene.write_stl(&mut stl)?;
//! # Ok::<(), adel::Error>(())
//! ```
//!
//! # Feature flags
#![doc = document_features::document_features!()]
#![warn(missing_docs)]

mod error;
pub use error::Error;

pub mod canopy;
pub mod params;
pub mod plantgen;
pub mod symbol;
