//! Phenology: Haun stage, green leaf number and senescence over thermal time
//!
//! The most frequent main stem is fit from calibration points by a
//! [`MainStemFit`]; every other axis is derived from that reference curve by
//! shifting and scaling its control points.
use crate::{
    Error,
    params::{
        A_COHORT_REDUCTION_FACTOR, DELAIS_PHYLL_COL_TIP_1ST,
        DELAIS_PHYLL_COL_TIP_NTH, DELAIS_PHYLL_HS_COL_NTH,
        DELAIS_PHYLL_SEN_DISP, END_MS_HS_MORTALITY_VS_N_PHYTOMER,
        FLAG_LIGULATION_DELAY, MS_HS_AT_TILLER_EMERGENCE,
        MS_TO_REGRESSIVE_TILLERS_SENESCENCE_DELAY, N2_MS_DIV_N2_COHORT,
        NUMBER_OF_ELONGATED_INTERNODES, START_MS_HS_MORTALITY_VS_N_PHYTOMER,
        TT_DEL_FHAUT,
    },
    plantgen::{
        Axis, AxisPopulation, MainStemCalibration,
        spline::{interp, linspace},
    },
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of grid points used when searching the senescence curve
const SEARCH_GRID: usize = 1000;

/// Haun stage as a two-phase linear function of thermal time
///
/// The stage is 0 until `tt_hs_0`, grows at `a_init` until `tt_hs_break`, then
/// at `a_late`, and is capped at `n_final`.  Both rates are positive, so the
/// stage never decreases.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct HaunStage {
    pub tt_hs_0: f64,
    pub a_init: f64,
    pub tt_hs_break: f64,
    pub a_late: f64,
    pub n_final: f64,
}

impl HaunStage {
    /// Single-phase Haun stage, as used for main stems
    pub fn linear(tt_hs_0: f64, a: f64, n_final: f64) -> Self {
        Self {
            tt_hs_0,
            a_init: a,
            tt_hs_break: tt_hs_0,
            a_late: a,
            n_final,
        }
    }

    fn hs_break(&self) -> f64 {
        self.a_init * (self.tt_hs_break - self.tt_hs_0)
    }

    /// Evaluates the Haun stage at the given thermal time
    pub fn eval(&self, tt: f64) -> f64 {
        let hs = if tt <= self.tt_hs_0 {
            0.0
        } else if tt <= self.tt_hs_break {
            self.a_init * (tt - self.tt_hs_0)
        } else {
            self.hs_break() + self.a_late * (tt - self.tt_hs_break)
        };
        hs.min(self.n_final)
    }

    /// Returns the thermal time at which the (uncapped) stage reaches `hs`
    ///
    /// Stages beyond `n_final` are extrapolated at the late rate.
    pub fn time_at(&self, hs: f64) -> f64 {
        let hs_break = self.hs_break();
        if hs <= 0.0 {
            self.tt_hs_0
        } else if hs <= hs_break {
            self.tt_hs_0 + hs / self.a_init
        } else {
            self.tt_hs_break + (hs - hs_break) / self.a_late
        }
    }
}

/// Values of a [`PhenologyCurve`] at a single thermal time
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct PhenologySample {
    pub tt: f64,
    /// Haun stage
    pub hs: f64,
    /// Green leaf number
    pub gl: f64,
    /// Senescence index, `hs - gl`
    pub ssi: f64,
}

/// Haun stage, green leaf and senescence dynamics of one axis type
///
/// Green leaf number follows the Haun stage until `t0`, then goes through a
/// list of `(TT, GL)` control points whose last value is 0.  It is never
/// negative nor above the Haun stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct PhenologyCurve {
    pub haun_stage: HaunStage,
    /// Start of leaf senescence
    pub t0: f64,
    /// Start of stem elongation (minimum of green leaves)
    pub t1: f64,
    pub tt_flag_ligulation: f64,
    /// Delay added to the senescence index
    pub senescence_delay: f64,
    /// Thermal time at which a regressive axis dies
    pub tt_stop: Option<f64>,
    gl_tt: Vec<f64>,
    gl: Vec<f64>,
}

impl PhenologyCurve {
    /// Builds a curve from its Haun stage and green leaf control points
    ///
    /// Control points must be in strictly increasing thermal time, start at
    /// `t0`, and end with a green leaf number of 0.
    pub fn new(
        haun_stage: HaunStage,
        knots: &[(f64, f64)],
        t1: f64,
        tt_flag_ligulation: f64,
    ) -> Result<Self, Error> {
        if knots.windows(2).any(|w| !(w[1].0 > w[0].0)) {
            return Err(Error::NonMonotonicControlPoints("green leaf number"));
        }
        let (Some(first), Some(last)) = (knots.first(), knots.last()) else {
            return Err(Error::MissingParameter("green leaf number"));
        };
        if last.1 != 0.0 {
            return Err(Error::BadParameter("green leaf number", last.1));
        }
        if !(haun_stage.a_init > 0.0 && haun_stage.a_late > 0.0) {
            return Err(Error::BadParameter("a_cohort", haun_stage.a_init));
        }
        Ok(Self {
            haun_stage,
            t0: first.0,
            t1,
            tt_flag_ligulation,
            senescence_delay: 0.0,
            tt_stop: None,
            gl_tt: knots.iter().map(|k| k.0).collect(),
            gl: knots.iter().map(|k| k.1).collect(),
        })
    }

    /// Iterates over the green leaf control points, as `(TT, GL)`
    pub fn knots(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.gl_tt.iter().cloned().zip(self.gl.iter().cloned())
    }

    /// Thermal time at which the axis appears
    pub fn tt_emergence(&self) -> f64 {
        self.haun_stage.tt_hs_0
    }

    /// Thermal time after which the green leaf number is 0
    pub fn final_control_point(&self) -> f64 {
        let last = self.gl_tt[self.gl_tt.len() - 1];
        match self.tt_stop {
            Some(s) => s.min(last),
            None => last,
        }
    }

    /// Checks whether the axis exists (emerged and not yet dead) at `tt`
    pub fn is_active(&self, tt: f64) -> bool {
        tt >= self.tt_emergence() && self.tt_stop.is_none_or(|s| tt < s)
    }

    /// Haun stage at `tt`
    pub fn haun_stage(&self, tt: f64) -> f64 {
        self.haun_stage.eval(tt)
    }

    /// Green leaf number at `tt`
    pub fn green_leaves(&self, tt: f64) -> f64 {
        if self.tt_stop.is_some_and(|s| tt >= s) {
            return 0.0;
        }
        let hs = self.haun_stage(tt);
        let gl = if tt <= self.gl_tt[0] {
            hs
        } else {
            interp(tt, &self.gl_tt, &self.gl)
        };
        (gl - self.senescence_delay).min(hs).max(0.0)
    }

    /// Senescence index at `tt`
    pub fn senescence_index(&self, tt: f64) -> f64 {
        self.haun_stage(tt) - self.green_leaves(tt)
    }

    /// Evaluates every dynamic at `tt`
    pub fn eval(&self, tt: f64) -> PhenologySample {
        let hs = self.haun_stage(tt);
        let gl = self.green_leaves(tt);
        PhenologySample {
            tt,
            hs,
            gl,
            ssi: hs - gl,
        }
    }

    /// Evaluates the curve over a thermal time series
    pub fn sample(&self, tt: &[f64]) -> Vec<PhenologySample> {
        tt.iter().map(|t| self.eval(*t)).collect()
    }

    /// Fraction of leaf `index` (1-based) that has senesced at `tt`
    pub fn senesced_fraction(&self, index: u32, tt: f64) -> f64 {
        (self.senescence_index(tt) - (index as f64 - 1.0)).clamp(0.0, 1.0)
    }

    /// Computes the development calendar of phytomer `index` (1-based)
    ///
    /// Leaves carried by elongated internodes stay on the plant until
    /// [`TT_DEL_FHAUT`]; the others fall [`DELAIS_PHYLL_SEN_DISP`]
    /// phyllochrons after being fully senesced.
    pub fn phytomer_timing(&self, index: u32, elongated: bool) -> PhytomerTiming {
        let n = index as f64;
        let hs_col = n + DELAIS_PHYLL_HS_COL_NTH;
        let delay_tip = if index == 1 {
            DELAIS_PHYLL_COL_TIP_1ST
        } else {
            DELAIS_PHYLL_COL_TIP_NTH
        };
        let tt_tip = self.haun_stage.time_at(hs_col - delay_tip);
        let tt_col = self.haun_stage.time_at(hs_col);

        let end = self.final_control_point();
        let tt_sen = if tt_col >= end {
            tt_col
        } else if self.senescence_index(end) < n {
            end
        } else {
            let grid = linspace(tt_col, end, SEARCH_GRID);
            let hit = grid
                .iter()
                .position(|t| self.senescence_index(*t) >= n)
                .unwrap_or(SEARCH_GRID - 1);
            if hit == 0 {
                tt_col
            } else {
                let (mut lo, mut hi) = (grid[hit - 1], grid[hit]);
                for _ in 0..60 {
                    let mid = (lo + hi) / 2.0;
                    if self.senescence_index(mid) >= n {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }
                hi
            }
        };
        let tt_del = if elongated {
            TT_DEL_FHAUT.max(tt_sen)
        } else {
            tt_sen + DELAIS_PHYLL_SEN_DISP / self.haun_stage.a_late
        };
        PhytomerTiming {
            index,
            tt_tip,
            tt_col,
            tt_sen,
            tt_del,
        }
    }

    /// Development calendars of every phytomer of the axis
    ///
    /// The last [`NUMBER_OF_ELONGATED_INTERNODES`] phytomers are considered
    /// to be on elongated internodes.
    pub fn phytomer_timings(&self) -> Vec<PhytomerTiming> {
        let n = self.haun_stage.n_final.round() as u32;
        let first_elongated =
            n.saturating_sub(NUMBER_OF_ELONGATED_INTERNODES) + 1;
        (1..=n)
            .map(|i| self.phytomer_timing(i, i >= first_elongated))
            .collect()
    }
}

/// Development calendar of one phytomer
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct PhytomerTiming {
    pub index: u32,
    /// Tip appearance
    pub tt_tip: f64,
    /// Collar appearance
    pub tt_col: f64,
    /// End of senescence
    pub tt_sen: f64,
    /// Disappearance
    pub tt_del: f64,
}

impl PhytomerTiming {
    /// Fraction of the final leaf length that is visible at `tt`
    pub fn visible_fraction(&self, tt: f64) -> f64 {
        let d = self.tt_col - self.tt_tip;
        if d <= 0.0 {
            return if tt >= self.tt_col { 1.0 } else { 0.0 };
        }
        ((tt - self.tt_tip) / d).clamp(0.0, 1.0)
    }

    /// Checks whether the leaf is on the plant at `tt`
    pub fn is_present(&self, tt: f64) -> bool {
        tt >= self.tt_tip && tt < self.tt_del
    }
}

/// Fits the most frequent main stem curve from calibration points
///
/// Implementations must return a curve with a non-decreasing Haun stage.
pub trait MainStemFit {
    /// Fits a main stem with `n_phytomer` leaves
    fn fit(
        &self,
        calibration: &MainStemCalibration,
        n_phytomer: u32,
    ) -> Result<PhenologyCurve, Error>;
}

/// Linear Haun stage and piecewise-linear green leaf number
///
/// `t0` is where the Haun stage reaches `n0`, `t1` is where it reaches
/// `N - NUMBER_OF_ELONGATED_INTERNODES`, and flag ligulation is where it
/// reaches `N`.  After flag ligulation, the measured green leaf numbers are
/// joined by straight lines.
#[derive(Copy, Clone, Debug, Default)]
pub struct PiecewiseLinearFit;

impl MainStemFit for PiecewiseLinearFit {
    fn fit(
        &self,
        calibration: &MainStemCalibration,
        n_phytomer: u32,
    ) -> Result<PhenologyCurve, Error> {
        calibration.validate()?;
        let c = calibration;
        let n = n_phytomer as f64;
        let hs = HaunStage::linear(c.tt_hs_0, c.a_cohort, n);
        let t0 = hs.time_at(c.n0);
        let t1 = hs.time_at(n - NUMBER_OF_ELONGATED_INTERNODES as f64);
        let flag = hs.time_at(n);
        if !(t0 < t1 && t1 < flag) {
            return Err(Error::NonMonotonicControlPoints(
                "t0, t1, TT_flag_ligulation",
            ));
        }
        let mut knots = vec![(t0, c.n0), (t1, c.n1), (flag, c.n2)];
        knots.extend(after(&c.gl_number, flag, 1.0, n_phytomer)?);
        PhenologyCurve::new(hs, &knots, t1, flag)
    }
}

/// Returns the control points strictly after `tt`, scaled by `ratio`
fn after(
    points: &[(f64, f64)],
    tt: f64,
    ratio: f64,
    n_phytomer: u32,
) -> Result<Vec<(f64, f64)>, Error> {
    let out: Vec<(f64, f64)> = points
        .iter()
        .filter(|(t, _)| *t > tt)
        .map(|(t, gl)| (*t, gl * ratio))
        .collect();
    if out.is_empty() {
        return Err(Error::NonMonotonicControlPoints("gl_number"));
    }
    let skipped = points.len() - out.len();
    if skipped > 0 {
        debug!(
            "skipped {skipped} green leaf point(s) before flag ligulation \
             for an axis with {n_phytomer} phytomers"
        );
    }
    Ok(out)
}

/// Phenology of the most frequent main stem, from which every axis derives
pub struct PhenologyModel {
    reference: PhenologyCurve,
    gl_number: Vec<(f64, f64)>,
    n_reference: u32,
    main_stems: BTreeMap<u32, PhenologyCurve>,
    regressive_cohorts: Option<(u32, u32)>,
}

impl PhenologyModel {
    /// Fits every main stem variant of the population
    pub fn new(
        calibration: &MainStemCalibration,
        population: &AxisPopulation,
        fit: &dyn MainStemFit,
    ) -> Result<Self, Error> {
        let n_reference = population.most_frequent_main_stem();
        let reference = fit.fit(calibration, n_reference)?;
        let mut main_stems = BTreeMap::new();
        for a in population.axes().iter().filter(|a| a.is_main_stem()) {
            if !main_stems.contains_key(&a.n_phytomer) {
                main_stems.insert(a.n_phytomer, fit.fit(calibration, a.n_phytomer)?);
            }
        }
        Ok(Self {
            reference,
            gl_number: calibration.gl_number.clone(),
            n_reference,
            main_stems,
            regressive_cohorts: population.regressive_cohorts(),
        })
    }

    /// Curve of the most frequent main stem
    pub fn reference(&self) -> &PhenologyCurve {
        &self.reference
    }

    /// Thermal times bounding the death of regressive axes
    ///
    /// The window runs from `HS_start = as * N + bs` to `HS_end = ae * N` on
    /// the most frequent main stem.
    pub fn mortality_window(&self) -> (f64, f64) {
        let n = self.n_reference as f64;
        let (a_s, b_s) = START_MS_HS_MORTALITY_VS_N_PHYTOMER;
        let hs = self.reference.haun_stage;
        (
            hs.time_at(a_s * n + b_s),
            hs.time_at(END_MS_HS_MORTALITY_VS_N_PHYTOMER * n),
        )
    }

    /// Derives the curve of `axis`; see [`derive_phenology_curve`]
    pub fn derive_phenology_curve(
        &self,
        axis: &Axis,
    ) -> Result<PhenologyCurve, Error> {
        if axis.is_main_stem() {
            return self
                .main_stems
                .get(&axis.n_phytomer)
                .cloned()
                .ok_or(Error::BadParameter(
                    "main stem n_phytomer",
                    axis.n_phytomer as f64,
                ));
        }
        let cohort = axis.cohort();
        let offset = axis
            .position
            .cohort_offset()
            .ok_or(Error::BadParameter("cohort", cohort as f64))?;

        let r = &self.reference;
        let a_ms = r.haun_stage.a_late;
        let n = axis.n_phytomer as f64;
        let dtt = MS_HS_AT_TILLER_EMERGENCE[offset] / a_ms;
        let tt_hs_0 = r.haun_stage.tt_hs_0 + dtt;
        let flag = r.tt_flag_ligulation + FLAG_LIGULATION_DELAY;

        // Shifted control points stay at least one main stem phyllochron
        // before the next one, so late cohorts keep t0 < t1 < flag
        let phyllochron = 1.0 / a_ms;
        let t1 = (r.t1 + dtt).min(flag - phyllochron);
        let t0 = (r.t0 + dtt).min(t1 - phyllochron);

        let a_init = a_ms * (1.0 + A_COHORT_REDUCTION_FACTOR);
        let tt_hs_break = t1.max(tt_hs_0);
        let hs_break = a_init * (tt_hs_break - tt_hs_0);
        let a_late = if flag > tt_hs_break && n > hs_break {
            (n - hs_break) / (flag - tt_hs_break)
        } else {
            a_ms
        };
        let haun_stage = HaunStage {
            tt_hs_0,
            a_init,
            tt_hs_break,
            a_late,
            n_final: n,
        };

        let ratio = N2_MS_DIV_N2_COHORT;
        let mut knots: Vec<(f64, f64)> = r
            .knots()
            .take(3)
            .map(|(t, gl)| (t, gl * ratio))
            .collect();
        knots[0].0 = t0;
        knots[1].0 = t1;
        knots[2].0 = flag;
        knots.extend(after(&self.gl_number, flag, ratio, axis.n_phytomer)?);

        let mut curve = PhenologyCurve::new(haun_stage, &knots, t1, flag)?;
        if axis.regressive {
            let (start, end) = self.mortality_window();
            let (lo, hi) = self.regressive_cohorts.unwrap_or((cohort, cohort));
            // Later cohorts die first
            let frac = if hi > lo {
                (hi as f64 - cohort as f64) / (hi - lo) as f64
            } else {
                0.5
            };
            let frac = frac.clamp(0.0, 1.0);
            curve.senescence_delay = MS_TO_REGRESSIVE_TILLERS_SENESCENCE_DELAY;
            curve.tt_stop = Some((start + frac * (end - start)).max(tt_hs_0));
        }
        Ok(curve)
    }
}

/// Derives the phenology curve of `axis` from the reference main stem
///
/// - Main stems use the calibration fit for their own leaf number
/// - Tillers start `MS_HS_AT_TILLER_EMERGENCE[cohort]` phyllochrons after the
///   main stem, and their `t0` and `t1` are shifted by the same delay.  They
///   grow at a reduced rate until their `t1`, reach their last leaf
///   [`FLAG_LIGULATION_DELAY`] after the main stem, and carry
///   [`N2_MS_DIV_N2_COHORT`] times fewer green leaves
/// - Regressive tillers also get a senescence delay and a stop time within
///   the [mortality window](PhenologyModel::mortality_window)
pub fn derive_phenology_curve(
    axis: &Axis,
    reference: &PhenologyModel,
) -> Result<PhenologyCurve, Error> {
    reference.derive_phenology_curve(axis)
}

/// Density of active axes at one thermal time
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub struct TilleringSample {
    pub tt: f64,
    pub per_square_meter: f64,
    pub per_plant: f64,
}

/// Computes the tillering dynamic of a stand over a thermal time grid
///
/// `axes` yields the cardinality and curve of each axis type.  An axis is
/// active once emerged, and (for regressive axes) until it dies.
pub fn tillering_dynamic<'a, I>(
    axes: I,
    plants_number: u32,
    plants_density: f64,
    tt_grid: &[f64],
) -> Vec<TilleringSample>
where
    I: IntoIterator<Item = (u32, &'a PhenologyCurve)>,
{
    let axes: Vec<_> = axes.into_iter().collect();
    let domain_area = plants_number as f64 / plants_density;
    tt_grid
        .iter()
        .map(|&tt| {
            let active: u32 = axes
                .iter()
                .filter(|(_, c)| c.is_active(tt))
                .map(|(n, _)| *n)
                .sum();
            TilleringSample {
                tt,
                per_square_meter: active as f64 / domain_area,
                per_plant: active as f64 / plants_number as f64,
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::plantgen::{AxisPosition, PlantgenConfig, derive_axis_population};
    use approx::assert_relative_eq;

    fn model() -> (AxisPopulation, PhenologyModel) {
        let cfg = PlantgenConfig::default();
        let pop = derive_axis_population(&cfg).unwrap();
        let model =
            PhenologyModel::new(&cfg.phenology, &pop, &PiecewiseLinearFit)
                .unwrap();
        (pop, model)
    }

    fn check_invariants(curve: &PhenologyCurve) {
        let end = curve.final_control_point();
        let grid = linspace(curve.tt_emergence() - 200.0, end + 500.0, 2000);
        let mut prev = f64::NEG_INFINITY;
        for s in curve.sample(&grid) {
            assert!(s.hs >= prev, "Haun stage decreased at {}", s.tt);
            prev = s.hs;
            assert!(s.gl >= 0.0);
            assert!(s.gl <= s.hs + 1e-12);
            if s.tt >= end {
                assert_eq!(s.gl, 0.0);
            }
        }
        assert_eq!(curve.green_leaves(end), 0.0);
    }

    #[test]
    fn reference_fit() {
        let (_, model) = model();
        let r = model.reference();
        assert_relative_eq!(r.t0, 4.7 * 95.0, epsilon = 1e-9);
        assert_relative_eq!(r.t1, 7.0 * 95.0, epsilon = 1e-9);
        assert_relative_eq!(r.tt_flag_ligulation, 11.0 * 95.0, epsilon = 1e-9);
        // Green leaves follow Haun stage until t0
        assert_relative_eq!(r.green_leaves(200.0), r.haun_stage(200.0));
        assert_relative_eq!(r.green_leaves(r.t1), 3.6, epsilon = 1e-9);
        assert_relative_eq!(r.green_leaves(1212.1), 5.4, epsilon = 1e-9);
        check_invariants(r);
    }

    #[test]
    fn every_axis_is_consistent() {
        let (pop, model) = model();
        for a in pop.axes() {
            let c = derive_phenology_curve(a, &model).unwrap();
            check_invariants(&c);
            assert_eq!(c.tt_stop.is_some(), a.regressive);
        }
    }

    #[test]
    fn tiller_transform() {
        let (_, model) = model();
        let r = model.reference();
        let t1 = Axis {
            position: AxisPosition::primary(1),
            n_phytomer: 9,
            regressive: false,
            cardinality: 1,
            probability: 0.9,
        };
        let c = derive_phenology_curve(&t1, &model).unwrap();
        assert_relative_eq!(
            c.tt_emergence(),
            MS_HS_AT_TILLER_EMERGENCE[1] * 95.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            c.haun_stage.a_init,
            r.haun_stage.a_late * (1.0 + A_COHORT_REDUCTION_FACTOR)
        );
        assert_relative_eq!(
            c.haun_stage(c.tt_flag_ligulation),
            9.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            c.tt_flag_ligulation,
            r.tt_flag_ligulation + FLAG_LIGULATION_DELAY
        );
        let max_gl = c.knots().map(|k| k.1).fold(0.0, f64::max);
        let max_ref = r.knots().map(|k| k.1).fold(0.0, f64::max);
        assert_relative_eq!(max_gl, max_ref * N2_MS_DIV_N2_COHORT);
    }

    #[test]
    fn tiller_control_points_follow_emergence() {
        let (_, model) = model();
        let r = model.reference();
        let t1 = Axis {
            position: AxisPosition::primary(1),
            n_phytomer: 8,
            regressive: false,
            cardinality: 1,
            probability: 0.9,
        };
        let c = derive_phenology_curve(&t1, &model).unwrap();
        let dtt = MS_HS_AT_TILLER_EMERGENCE[1] * 95.0;
        assert_relative_eq!(c.t0, r.t0 + dtt, epsilon = 1e-9);
        assert_relative_eq!(c.t1, r.t1 + dtt, epsilon = 1e-9);
        assert_relative_eq!(c.haun_stage.tt_hs_break, r.t1 + dtt, epsilon = 1e-9);
        let k: Vec<_> = c.knots().collect();
        assert_relative_eq!(k[0].0, c.t0);
        assert_relative_eq!(k[1].0, c.t1);

        // Later cohorts are capped before the flag leaf
        let t4 = Axis {
            position: AxisPosition::primary(4),
            n_phytomer: 6,
            ..t1
        };
        let c = derive_phenology_curve(&t4, &model).unwrap();
        assert!(c.t0 < c.t1 && c.t1 < c.tt_flag_ligulation);
        assert_relative_eq!(c.t1, c.tt_flag_ligulation - 95.0, epsilon = 1e-9);
        check_invariants(&c);
    }

    #[test]
    fn regressive_stops_in_window() {
        let (_, model) = model();
        let (start, end) = model.mortality_window();
        assert!(start < end);
        let t3 = Axis {
            position: AxisPosition::primary(3),
            n_phytomer: 8,
            regressive: true,
            cardinality: 1,
            probability: 0.8,
        };
        let c = derive_phenology_curve(&t3, &model).unwrap();
        let stop = c.tt_stop.unwrap();
        assert!(stop >= start && stop <= end);
        assert!(!c.is_active(stop));
        assert!(c.is_active(stop - 1.0));
        assert_eq!(c.green_leaves(stop), 0.0);
    }

    #[test]
    fn non_monotonic_calibration() {
        let mut cfg = PlantgenConfig::default();
        // t0 after t1
        cfg.phenology.n0 = 8.0;
        assert!(matches!(
            PiecewiseLinearFit.fit(&cfg.phenology, 11),
            Err(Error::NonMonotonicControlPoints(_))
        ));

        let mut cfg = PlantgenConfig::default();
        cfg.phenology.gl_number = vec![(900.0, 3.0), (1000.0, 0.0)];
        assert!(matches!(
            PiecewiseLinearFit.fit(&cfg.phenology, 11),
            Err(Error::NonMonotonicControlPoints("gl_number"))
        ));
    }

    #[test]
    fn phytomer_calendar_is_ordered() {
        let (pop, model) = model();
        for a in pop.axes() {
            let c = derive_phenology_curve(a, &model).unwrap();
            let timings = c.phytomer_timings();
            assert_eq!(timings.len(), a.n_phytomer as usize);
            for t in &timings {
                assert!(t.tt_tip <= t.tt_col);
                assert!(t.tt_col <= t.tt_sen, "{t:?}");
                assert!(t.tt_sen <= t.tt_del);
            }
            for w in timings.windows(2) {
                assert!(w[0].tt_tip < w[1].tt_tip);
            }
        }
    }

    #[test]
    fn leaf_growth_fractions() {
        let (_, model) = model();
        let r = model.reference();
        let t = r.phytomer_timing(5, false);
        assert_eq!(t.visible_fraction(t.tt_tip - 1.0), 0.0);
        assert_eq!(t.visible_fraction(t.tt_col), 1.0);
        assert_relative_eq!(
            t.visible_fraction((t.tt_tip + t.tt_col) / 2.0),
            0.5,
            epsilon = 1e-9
        );
        assert_relative_eq!(r.senesced_fraction(5, t.tt_sen), 1.0, epsilon = 1e-6);
        assert_eq!(r.senesced_fraction(5, t.tt_col), 0.0);
    }

    #[test]
    fn tillering() {
        let (pop, model) = model();
        let curves: Vec<_> = pop
            .axes()
            .iter()
            .map(|a| (a.cardinality, derive_phenology_curve(a, &model).unwrap()))
            .collect();
        let grid = linspace(-100.0, 2000.0, 211);
        let dyn_ = tillering_dynamic(
            curves.iter().map(|(n, c)| (*n, c)),
            pop.plants_number(),
            250.0,
            &grid,
        );
        assert_eq!(dyn_[0].per_plant, 0.0);
        let peak = dyn_.iter().map(|s| s.per_plant).fold(0.0, f64::max);
        let last = dyn_.last().unwrap();
        assert!(peak > last.per_plant);
        // Ear-bearing axes survive: 500 ears/m² over 250 plants/m²
        assert_relative_eq!(last.per_plant, 2.0, epsilon = 1e-9);
        assert_relative_eq!(last.per_square_meter, 500.0, epsilon = 1e-9);
    }
}
