//! Per-run configuration of the plant generator
use crate::{Error, plantgen::DimensionRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Population-level inputs of [`plantgen`](crate::plantgen)
///
/// The default value is a reference winter wheat stand, calibrated on field
/// measurements; callers will usually start from it and override a few
/// fields:
///
/// ```
/// # use adel::plantgen::PlantgenConfig;
/// let cfg = PlantgenConfig {
///     plants_number: 4,
///     ..PlantgenConfig::default()
/// };
/// cfg.validate()?;
/// # Ok::<(), adel::Error>(())
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlantgenConfig {
    /// Number of plants to generate
    pub plants_number: u32,

    /// Number of plants per square meter
    pub plants_density: f64,

    /// Number of ear-bearing axes per square meter
    pub ears_density: f64,

    /// Probability of each final leaf number on the main stem
    pub ms_leaves_number_probabilities: BTreeMap<u32, f64>,

    /// Emergence probability of each primary tiller, keyed by tiller number
    /// (i.e. `0` is `T0`)
    ///
    /// A tiller with no entry never emerges.
    pub tiller_probabilities: BTreeMap<u32, f64>,

    /// Phenology of the most frequent main stem
    pub phenology: MainStemCalibration,

    /// Organ dimensions of the most frequent main stem, from phytomer 1
    pub dimensions: Vec<DimensionRecord>,
}

/// Calibration points of the most frequent main stem
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MainStemCalibration {
    /// Rate of Haun stage vs. thermal time (1 / phyllochron)
    pub a_cohort: f64,

    /// Thermal time at which Haun stage is 0
    pub tt_hs_0: f64,

    /// Green leaf number at the start of senescence (`t0`)
    pub n0: f64,

    /// Green leaf number at the start of stem elongation (`t1`)
    pub n1: f64,

    /// Green leaf number at flag leaf ligulation
    pub n2: f64,

    /// Measured green leaf numbers after flag ligulation, as `(TT, GL)`
    ///
    /// Thermal times must be strictly increasing, and the last green leaf
    /// number must be 0 (end of senescence).
    pub gl_number: Vec<(f64, f64)>,
}

impl Default for PlantgenConfig {
    fn default() -> Self {
        let l_blade = [
            9.0, 10.5, 12.2, 14.0, 16.1, 18.5, 21.4, 24.0, 25.2, 23.1, 18.9,
        ];
        let w_blade =
            [0.35, 0.38, 0.42, 0.47, 0.53, 0.60, 0.73, 0.88, 1.05, 1.22, 1.40];
        let l_sheath =
            [4.0, 4.6, 5.2, 6.0, 7.0, 8.4, 10.1, 12.3, 14.6, 16.8, 18.5];
        let w_sheath =
            [0.15, 0.16, 0.18, 0.20, 0.22, 0.25, 0.30, 0.36, 0.42, 0.47, 0.50];
        let l_internode =
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.1, 6.2, 12.4, 21.7];
        let w_internode =
            [0.08, 0.08, 0.08, 0.09, 0.10, 0.11, 0.13, 0.25, 0.32, 0.38, 0.42];
        let dimensions = (0..l_blade.len())
            .map(|i| DimensionRecord {
                l_blade: l_blade[i],
                w_blade: w_blade[i],
                l_sheath: l_sheath[i],
                w_sheath: w_sheath[i],
                l_internode: l_internode[i],
                w_internode: w_internode[i],
            })
            .collect();

        Self {
            plants_number: 100,
            plants_density: 250.0,
            ears_density: 500.0,
            ms_leaves_number_probabilities: [(10, 0.145), (11, 0.818), (12, 0.037)]
                .into_iter()
                .collect(),
            tiller_probabilities: [
                (0, 0.0),
                (1, 0.900),
                (2, 0.983),
                (3, 0.817),
                (4, 0.117),
            ]
            .into_iter()
            .collect(),
            phenology: MainStemCalibration {
                a_cohort: 1.0 / 95.0,
                tt_hs_0: 0.0,
                n0: 4.7,
                n1: 3.6,
                n2: 5.8,
                gl_number: vec![
                    (1117.0, 5.6),
                    (1212.1, 5.4),
                    (1368.7, 4.9),
                    (1686.8, 2.4),
                    (1880.0, 0.0),
                ],
            },
            dimensions,
        }
    }
}

impl PlantgenConfig {
    /// Checks that the configuration is usable
    ///
    /// Nothing is corrected here: any inconsistency is reported.
    pub fn validate(&self) -> Result<(), Error> {
        if self.plants_number == 0 {
            return Err(Error::BadParameter("plants_number", 0.0));
        }
        if !(self.plants_density > 0.0) {
            return Err(Error::BadParameter(
                "plants_density",
                self.plants_density,
            ));
        }
        if !(self.ears_density >= 0.0) {
            return Err(Error::BadParameter("ears_density", self.ears_density));
        }

        if self.ms_leaves_number_probabilities.is_empty() {
            return Err(Error::MissingParameter(
                "ms_leaves_number_probabilities",
            ));
        }
        for (n, p) in &self.ms_leaves_number_probabilities {
            if *n == 0 || !(0.0..=1.0).contains(p) {
                return Err(Error::BadProbability(format!("MS {n}"), *p));
            }
        }
        let sum: f64 = self.ms_leaves_number_probabilities.values().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(Error::BadProbability(
                "ms_leaves_number_probabilities".to_owned(),
                sum,
            ));
        }
        for (t, p) in &self.tiller_probabilities {
            if !(0.0..=1.0).contains(p) {
                return Err(Error::BadProbability(format!("T{t}"), *p));
            }
        }

        self.phenology.validate()?;

        if self.dimensions.is_empty() {
            return Err(Error::MissingParameter("dimensions"));
        }
        for d in &self.dimensions {
            d.validate()?;
        }
        Ok(())
    }

    /// Number of ear-bearing axes per plant
    pub fn ears_per_plant(&self) -> f64 {
        self.ears_density / self.plants_density
    }

    /// Ground area covered by the generated plants, in square meters
    pub fn domain_area(&self) -> f64 {
        self.plants_number as f64 / self.plants_density
    }
}

impl MainStemCalibration {
    /// Checks the calibration points for consistency
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.a_cohort > 0.0) {
            return Err(Error::BadParameter("a_cohort", self.a_cohort));
        }
        if !self.tt_hs_0.is_finite() {
            return Err(Error::BadParameter("tt_hs_0", self.tt_hs_0));
        }
        for (name, v) in [("n0", self.n0), ("n1", self.n1), ("n2", self.n2)] {
            if !(v >= 0.0) {
                return Err(Error::BadParameter(name, v));
            }
        }
        let Some(&(_, last)) = self.gl_number.last() else {
            return Err(Error::MissingParameter("gl_number"));
        };
        if self.gl_number.windows(2).any(|w| !(w[1].0 > w[0].0)) {
            return Err(Error::NonMonotonicControlPoints("gl_number"));
        }
        if let Some(&(_, gl)) = self.gl_number.iter().find(|(_, gl)| !(*gl >= 0.0))
        {
            return Err(Error::BadParameter("gl_number", gl));
        }
        if last != 0.0 {
            return Err(Error::BadParameter("gl_number", last));
        }
        Ok(())
    }
}
