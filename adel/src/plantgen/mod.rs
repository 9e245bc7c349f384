//! Plant generation: from population-level inputs to per-axis parameters
//!
//! Generation runs in three stages, each one feeding the next:
//!
//! 1. [`derive_axis_population`] decides which axes exist, how many of each,
//!    and which of them are regressive
//! 2. [`PhenologyModel`] fits the most frequent main stem from its calibration
//!    points, then [`derive_phenology_curve`] derives every other axis
//! 3. [`DimensionModel`] does the same for organ dimensions, with
//!    [`derive_dimensions`]
//!
//! ```
//! use adel::plantgen::{
//!     DimensionModel, PhenologyModel, PiecewiseLinearFit, PlantgenConfig,
//!     derive_axis_population,
//! };
//!
//! let cfg = PlantgenConfig::default();
//! let population = derive_axis_population(&cfg)?;
//! let phenology =
//!     PhenologyModel::new(&cfg.phenology, &population, &PiecewiseLinearFit)?;
//! let dimensions = DimensionModel::new(&cfg.dimensions)?;
//! for axis in population.axes() {
//!     let curve = phenology.derive_phenology_curve(axis)?;
//!     let dims = dimensions.derive_dimensions(axis);
//!     assert_eq!(dims.len() as u32, axis.n_phytomer);
//!     assert_eq!(curve.green_leaves(curve.final_control_point()), 0.0);
//! }
//! # Ok::<(), adel::Error>(())
//! ```
mod axis;
mod config;
mod dimensions;
mod phenology;
mod population;
mod spline;

pub use axis::{Axis, AxisPosition};
pub use config::{MainStemCalibration, PlantgenConfig};
pub use dimensions::{
    DimensionModel, DimensionRecord, derive_dimensions, relative_index,
};
pub use phenology::{
    HaunStage, MainStemFit, PhenologyCurve, PhenologyModel, PhenologySample,
    PhytomerTiming, PiecewiseLinearFit, TilleringSample,
    derive_phenology_curve, tillering_dynamic,
};
pub use population::{
    AxisPopulation, PositionCount, derive_axis_population, largest_remainder,
    tiller_phytomers,
};
pub use spline::{Spline, interp, linspace};
