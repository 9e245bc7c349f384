//! Inner parameters of the plant generation model
//!
//! These are fixed biological and statistical constants, shared by every stage
//! of [`plantgen`](crate::plantgen).  They are not meant to be tuned per run;
//! the per-run inputs live in
//! [`PlantgenConfig`](crate::plantgen::PlantgenConfig).

/// Coefficients `a_1` and `a_2` used to compute the final number of leaves on
/// tillers from the final number of leaves on the main stem
///
/// ```text
/// tiller_final_leaves_number = a_1 * MS_final_leaves_number - a_2 * cohort_number
/// ```
///
/// The coefficients are calibrated on cohort numbers, where the main stem is 1
/// (see [`AxisPosition::cohort_number`](crate::plantgen::AxisPosition::cohort_number)).
pub const SECONDARY_STEM_LEAVES_NUMBER_COEFFICIENTS: LeavesNumberCoefficients =
    LeavesNumberCoefficients {
        a_1: 0.9423,
        a_2: 0.555,
    };

/// Linear relation between main stem and tiller final leaf numbers
#[derive(Copy, Clone, Debug)]
#[allow(missing_docs)]
pub struct LeavesNumberCoefficients {
    pub a_1: f64,
    pub a_2: f64,
}

/// Standard deviation on the emergence date of main stems, in phyllochrons
pub const MS_EMERGENCE_STANDARD_DEVIATION: f64 = 0.3;

/// Standard deviation on the emergence date of tillers, in phyllochrons
pub const TILLERS_EMERGENCE_STANDARD_DEVIATION: f64 = 0.2;

/// Haun stage of the most frequent main stem at the emergence of each tiller
///
/// Indexed by cohort offset, i.e. `T0` is at index 0.  A cohort beyond the end
/// of this table never emerges.
pub const MS_HS_AT_TILLER_EMERGENCE: [f64; 11] =
    [1.9, 2.5, 3.2, 4.3, 5.5, 6.9, 9.16, 11.9, 15.4, 20.1, 26.1];

/// Ratio between the maximum number of green leaves on tillers and on the main
/// stem
pub const N2_MS_DIV_N2_COHORT: f64 = 0.85;

/// Delay between tip and collar appearance for the first leaf, in phyllochrons
pub const DELAIS_PHYLL_COL_TIP_1ST: f64 = 1.0;

/// Delay between tip and collar appearance for every other leaf, in
/// phyllochrons
pub const DELAIS_PHYLL_COL_TIP_NTH: f64 = 1.6;

/// Delay between Haun stage and collar appearance, in phyllochrons
pub const DELAIS_PHYLL_HS_COL_NTH: f64 = -0.20;

/// Time during which a fully senesced leaf on a non-elongated internode stays
/// on the plant, in phyllochrons
pub const DELAIS_PHYLL_SEN_DISP: f64 = 3.0;

/// Thermal time at which leaves on elongated internodes disappear (°C.day)
pub const TT_DEL_FHAUT: f64 = 3000.0;

/// Delay between a parent cohort and its first possible child cohort
pub const FIRST_CHILD_DELAY: u32 = 2;

/// Reduction applied to main stem lengths for regressive tillers
pub const LENGTHS_REDUCTION_FACTOR: f64 = -0.115;

/// Reduction applied to main stem widths for regressive tillers
pub const WIDTHS_REDUCTION_FACTOR: f64 = -0.0938;

/// Shift of the phytomer index per cohort number, from main stem to tillers
pub const SLOPE_SHIFT_MS_TO_TILLERS: f64 = -0.6681;

/// Blade length of phytomer 1 for every tiller
pub const TILLERS_L_BLADE_1ST: f64 = 6.5;

/// Internode width polynomial, fitted on main stem measurements
pub const W_INTERNODE_POLYNOMIAL: InternodePolynomial = InternodePolynomial {
    coefficients: [-2.4527, 7.6398, -4.207],
    first_point_index: 0.6,
    first_point_width: 0.6,
};

/// Quadratic in normalized phytomer index, with a lower bound of validity
#[derive(Copy, Clone, Debug)]
pub struct InternodePolynomial {
    /// `a0`, `a1`, `a2`
    pub coefficients: [f64; 3],
    /// Normalized index of the first point where the polynomial applies
    pub first_point_index: f64,
    /// Normalized width held below `first_point_index`
    pub first_point_width: f64,
}

impl InternodePolynomial {
    /// Evaluates the normalized internode width
    ///
    /// Below the first point, the width is held at the first point's value
    /// rather than extrapolated.
    pub fn eval(&self, x: f64) -> f64 {
        if x < self.first_point_index {
            self.first_point_width
        } else {
            let [a0, a1, a2] = self.coefficients;
            a0 + a1 * x + a2 * x * x
        }
    }
}

/// Delay added to the senescence index of regressive tillers
pub const MS_TO_REGRESSIVE_TILLERS_SENESCENCE_DELAY: f64 = 0.0;

/// Reduction applied to the initial Haun stage rate of tillers
pub const A_COHORT_REDUCTION_FACTOR: f64 = -0.53;

/// Ligulation delay of the flag leaf on tillers (°C.day)
pub const FLAG_LIGULATION_DELAY: f64 = 20.0;

/// Reduction of emergence probability for each secondary step
///
/// Each step multiplies by the probability of the primary tiller of the same
/// cohort:
///
/// ```text
/// p(T1.0)   = p(T1) * (1 - R) * p(T3)
/// p(T1.0.0) = p(T1) * (1 - R) * p(T3) * (1 - R) * p(T5)
/// ```
pub const EMERGENCE_PROBABILITY_REDUCTION_FACTOR: f64 = 0.29;

/// Number of elongated internodes, used to place `t1`
pub const NUMBER_OF_ELONGATED_INTERNODES: u32 = 4;

/// Proportional factor relative to the first leaf of each tiller
pub const K1: f64 = 0.854;

/// Proportional factor relative to the last leaf of each tiller
pub const K2: f64 = 0.91;

/// Start of main stem mortality (in Haun stage) vs. its phytomer count
///
/// `HS_start = as * N + bs`
pub const START_MS_HS_MORTALITY_VS_N_PHYTOMER: (f64, f64) = (0.2411, 4.2546);

/// End of main stem mortality (in Haun stage) vs. its phytomer count
///
/// `HS_end = ae * N`
pub const END_MS_HS_MORTALITY_VS_N_PHYTOMER: f64 = 1.0247;
