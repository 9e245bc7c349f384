use crate::symbol::AngleMode;

/// Number of threads to use when generating organs
///
/// Without the `rayon` feature, only [`ThreadCount::One`] is available.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ThreadCount {
    /// Generate every axis instance in the calling thread
    One,

    /// Use the global `rayon` pool
    #[cfg(feature = "rayon")]
    Global,

    /// Use a dedicated pool with this many worker threads
    #[cfg(feature = "rayon")]
    Many(std::num::NonZeroUsize),
}

impl Default for ThreadCount {
    fn default() -> Self {
        #[cfg(feature = "rayon")]
        {
            ThreadCount::Global
        }
        #[cfg(not(feature = "rayon"))]
        {
            ThreadCount::One
        }
    }
}

#[cfg(feature = "rayon")]
impl From<std::num::NonZeroUsize> for ThreadCount {
    fn from(v: std::num::NonZeroUsize) -> Self {
        match v.get() {
            1 => ThreadCount::One,
            _ => ThreadCount::Many(v),
        }
    }
}

/// Single-threaded mode is shown as `-`, the global pool as `*`; otherwise,
/// an integer
impl std::fmt::Display for ThreadCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadCount::One => write!(f, "-"),
            #[cfg(feature = "rayon")]
            ThreadCount::Global => write!(f, "*"),
            #[cfg(feature = "rayon")]
            ThreadCount::Many(n) => write!(f, "{n}"),
        }
    }
}

/// Settings when building the organs of a [`Canopy`](super::Canopy)
#[derive(Copy, Clone, Debug, Default)]
pub struct CanopySettings {
    /// Seed overriding every per-leaf seed
    ///
    /// When this is `None`, each leaf gets a seed derived from the `base_seed`
    /// given to [`Canopy::organs_at`](super::Canopy::organs_at).
    pub seed: Option<u64>,

    /// Interpretation of leaf insertion angles
    pub angle_mode: AngleMode,

    /// Always use the exact stem tessellation
    pub classic: bool,

    /// Threads used to generate axis instances
    pub threads: ThreadCount,
}
