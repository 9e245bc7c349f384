//! Module containing the ADEL universal error type
use thiserror::Error;

/// Universal error type for ADEL
#[derive(Error, Debug)]
pub enum Error {
    /// No reference shape for a leaf rank (or its neighbors)
    #[error(
        "leaf curvature index {rank} not found in database, \
         available indices are: {available:?}"
    )]
    ShapeNotFound {
        /// Requested rank, after clamping to the database maximum
        rank: u32,
        /// Ranks present in the database
        available: Vec<u32>,
    },

    /// The leaf shape database has no ranks at all
    #[error("leaf shape database is empty")]
    EmptyDatabase,

    /// A leaf shape has mismatched or too-short coordinate arrays
    #[error("leaf shape {0} is malformed: {1}")]
    BadShape(u32, &'static str),

    /// Explicit shape index is past the end of the candidate list
    #[error("shape index {index} is out of range for rank {rank} ({count} shapes)")]
    BadShapeIndex {
        /// 1-based index requested by the caller
        index: usize,
        /// Rank used for the lookup
        rank: u32,
        /// Number of candidate shapes for that rank
        count: usize,
    },

    /// Tissue type has no optical species
    #[error("tissue type {0} has no optical species (expected 1..=12)")]
    BadTissueType(i32),

    /// Calibration control points are not strictly increasing
    #[error("control points of `{0}` are not strictly increasing")]
    NonMonotonicControlPoints(&'static str),

    /// A required configuration value is missing
    #[error("missing required parameter `{0}`")]
    MissingParameter(&'static str),

    /// A configuration value is outside of its valid range
    #[error("parameter `{0}` is out of range: {1}")]
    BadParameter(&'static str, f64),

    /// A probability table does not describe a valid distribution
    #[error("invalid probability {1} for `{0}`")]
    BadProbability(String, f64),

    /// IO error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Could not build a worker thread pool
    #[cfg(feature = "rayon")]
    #[error("could not build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
