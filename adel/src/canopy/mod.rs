//! End-to-end generation of a stand's organs at a given thermal time
//!
//! A [`Canopy`] runs every [`plantgen`](crate::plantgen) stage once, then
//! builds organs on demand with [`Canopy::organs_at`].
//!
//! ```
//! use adel::{
//!     canopy::{Canopy, CanopySettings},
//!     plantgen::PlantgenConfig,
//!     symbol::LeafShapeDatabase,
//! };
//!
//! let db = LeafShapeDatabase::sample();
//! let cfg = PlantgenConfig {
//!     plants_number: 2,
//!     ..PlantgenConfig::default()
//! };
//! let canopy = Canopy::new(cfg, &db, CanopySettings::default())?;
//! let organs = canopy.organs_at(800.0, 0)?;
//! assert!(!organs.is_empty());
//! # Ok::<(), adel::Error>(())
//! ```
use crate::{
    Error,
    plantgen::{
        Axis, AxisPopulation, DimensionModel, DimensionRecord, MainStemFit,
        PhenologyCurve, PhenologyModel, PhytomerTiming, PiecewiseLinearFit,
        PlantgenConfig, TilleringSample, derive_axis_population,
        tillering_dynamic,
    },
    symbol::{LeafShapeDatabase, LeafSpec, Organ, StemSpec, Symbols},
};
use log::{debug, info};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::BTreeMap;

mod config;
mod graph;

pub use config::{CanopySettings, ThreadCount};
pub use graph::{
    GEOMETRY, LABEL, PropertyGraph, PropertyTable, PropertyValue, TISSUE_TYPE,
    attach_organ,
};

/// Tissue type of green blades
pub const GREEN_BLADE: i32 = 1;
/// Tissue type of green sheaths and internodes
pub const GREEN_STEM: i32 = 2;
/// Tissue type of senesced blades
pub const SENESCED_BLADE: i32 = 3;
/// Tissue type of senesced sheaths and internodes
pub const SENESCED_STEM: i32 = 4;

/// Inclination of tillers from the vertical, in radians
const TILLER_INCLINATION: f32 = 0.3;

/// Azimuthal step between consecutive tiller slots (golden angle)
const TILLER_AZIMUTH: f32 = 2.399_963;

/// Element of a phytomer
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, strum::Display)]
#[allow(missing_docs)]
pub enum Element {
    Internode,
    Sheath,
    Blade,
}

/// Everything needed to build the organs of one axis type
#[derive(Clone, Debug)]
pub struct AxisModel {
    /// Axis type, with its cardinality
    pub axis: Axis,
    /// Phenology of this axis type
    pub curve: PhenologyCurve,
    /// Organ dimensions, by phytomer
    pub dimensions: BTreeMap<u32, DimensionRecord>,
    /// Development calendar, by phytomer
    pub timings: Vec<PhytomerTiming>,
}

/// An organ placed in the canopy
#[derive(Clone, Debug)]
pub struct CanopyOrgan {
    /// Composite code of the axis type
    pub id_phen: u32,
    /// Plant carrying this organ, in `0..plants_number`
    pub plant: u32,
    /// Axis instance, unique across the canopy
    pub instance: u32,
    /// Phytomer index, from 1
    pub phytomer: u32,
    /// Element of the phytomer
    pub element: Element,
    /// Position of the organ relative to the base of its plant
    pub placement: Isometry3<f32>,
    /// Generated organ
    pub organ: Organ,
}

/// One axis instance to generate
#[derive(Copy, Clone, Debug)]
struct Instance {
    axis: usize,
    plant: u32,
    id: u32,
}

/// A wheat stand, ready to produce organs at any thermal time
pub struct Canopy<'a> {
    config: PlantgenConfig,
    population: AxisPopulation,
    axes: Vec<AxisModel>,
    instances: Vec<Instance>,
    symbols: Symbols<'a>,
    threads: ThreadCount,
}

impl<'a> Canopy<'a> {
    /// Builds a canopy, fitting main stems with [`PiecewiseLinearFit`]
    pub fn new(
        config: PlantgenConfig,
        database: &'a LeafShapeDatabase,
        settings: CanopySettings,
    ) -> Result<Self, Error> {
        Self::with_fit(config, database, settings, &PiecewiseLinearFit)
    }

    /// Builds a canopy with a custom main stem fit
    pub fn with_fit(
        config: PlantgenConfig,
        database: &'a LeafShapeDatabase,
        settings: CanopySettings,
        fit: &dyn MainStemFit,
    ) -> Result<Self, Error> {
        let start = std::time::Instant::now();
        let population = derive_axis_population(&config)?;
        let phenology = PhenologyModel::new(&config.phenology, &population, fit)?;
        let dimensions = DimensionModel::new(&config.dimensions)?;

        let axes = population
            .axes()
            .iter()
            .map(|axis| {
                let curve = phenology.derive_phenology_curve(axis)?;
                Ok(AxisModel {
                    axis: axis.clone(),
                    dimensions: dimensions.derive_dimensions(axis),
                    timings: curve.phytomer_timings(),
                    curve,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        // Instances of one position go to distinct plants
        let mut next_plant: BTreeMap<_, u32> = BTreeMap::new();
        let mut instances = vec![];
        for (i, m) in axes.iter().enumerate() {
            for _ in 0..m.axis.cardinality {
                let p = next_plant.entry(m.axis.position.clone()).or_default();
                instances.push(Instance {
                    axis: i,
                    plant: *p % config.plants_number,
                    id: instances.len() as u32,
                });
                *p += 1;
            }
        }
        info!(
            "Built canopy of {} plants ({} axis types, {} instances) in {:?}",
            config.plants_number,
            axes.len(),
            instances.len(),
            start.elapsed()
        );

        let symbols = Symbols {
            database,
            seed: settings.seed,
            angle_mode: settings.angle_mode,
            classic: settings.classic,
        };
        Ok(Self {
            config,
            population,
            axes,
            instances,
            symbols,
            threads: settings.threads,
        })
    }

    /// Configuration used to build this canopy
    pub fn config(&self) -> &PlantgenConfig {
        &self.config
    }

    /// Axis population of the stand
    pub fn population(&self) -> &AxisPopulation {
        &self.population
    }

    /// Per-axis-type models, in emergence order
    pub fn axes(&self) -> &[AxisModel] {
        &self.axes
    }

    /// Tillering dynamic of the stand over a thermal time grid
    pub fn tillering_dynamic(&self, tt_grid: &[f64]) -> Vec<TilleringSample> {
        tillering_dynamic(
            self.axes.iter().map(|m| (m.axis.cardinality, &m.curve)),
            self.config.plants_number,
            self.config.plants_density,
            tt_grid,
        )
    }

    /// Builds every organ present at thermal time `tt`
    ///
    /// Organs are ordered by axis instance, then phytomer, then element.
    /// Unless the canopy has a fixed seed, leaf shapes are drawn with seeds
    /// derived from `base_seed`, so the result only depends on `tt` and
    /// `base_seed` (and not on the number of threads).
    pub fn organs_at(
        &self,
        tt: f64,
        base_seed: u64,
    ) -> Result<Vec<CanopyOrgan>, Error> {
        let start = std::time::Instant::now();
        let run = |inst: &Instance| self.instance_organs(inst, tt, base_seed);
        let per_instance: Vec<Vec<CanopyOrgan>> = match self.threads {
            ThreadCount::One => self
                .instances
                .iter()
                .map(run)
                .collect::<Result<_, Error>>()?,
            #[cfg(feature = "rayon")]
            ThreadCount::Global => {
                use rayon::prelude::*;
                self.instances
                    .par_iter()
                    .map(run)
                    .collect::<Result<_, Error>>()?
            }
            #[cfg(feature = "rayon")]
            ThreadCount::Many(n) => {
                use rayon::prelude::*;
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n.get())
                    .build()?;
                pool.install(|| {
                    self.instances
                        .par_iter()
                        .map(run)
                        .collect::<Result<_, Error>>()
                })?
            }
        };
        let out: Vec<CanopyOrgan> = per_instance.into_iter().flatten().collect();
        debug!(
            "built {} organs at TT = {tt} in {:?} (threads: {})",
            out.len(),
            start.elapsed(),
            self.threads
        );
        Ok(out)
    }

    /// Builds the organs of one axis instance
    fn instance_organs(
        &self,
        inst: &Instance,
        tt: f64,
        base_seed: u64,
    ) -> Result<Vec<CanopyOrgan>, Error> {
        let model = &self.axes[inst.axis];
        if !model.curve.is_active(tt) {
            return Ok(vec![]);
        }
        let mut rng = StdRng::seed_from_u64(base_seed ^ inst.id as u64);
        let axis_frame = axis_frame(&model.axis);
        let id_phen = model.axis.id_phen();

        let mut out = vec![];
        let mut z = 0.0;
        for t in &model.timings {
            let Some(d) = model.dimensions.get(&t.index) else {
                continue;
            };
            if !t.is_present(tt) {
                continue;
            }
            let growth = t.visible_fraction(tt);
            let senesced = model.curve.senesced_fraction(t.index, tt);
            let stem_tissue = if senesced >= 1.0 {
                SENESCED_STEM
            } else {
                GREEN_STEM
            };
            let mut push = |element, offset: f32, azimuth: f32, organ| {
                let placement = axis_frame
                    * Translation3::new(0.0, 0.0, offset)
                    * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), azimuth);
                out.push(CanopyOrgan {
                    id_phen,
                    plant: inst.plant,
                    instance: inst.id,
                    phytomer: t.index,
                    element,
                    placement,
                    organ,
                });
            };

            // Internodes elongate once the leaf is ligulated
            let duration = t.tt_col - t.tt_tip;
            let elongation = if duration > 0.0 {
                ((tt - t.tt_col) / duration).clamp(0.0, 1.0)
            } else if tt >= t.tt_col {
                1.0
            } else {
                0.0
            };
            let internode = d.l_internode * elongation;
            if d.l_internode > 0.0 {
                let organ = self.symbols.build_stem(&StemSpec {
                    tissue_type: stem_tissue,
                    length: internode,
                    diameter_base: d.w_internode,
                    diameter_top: d.w_internode,
                })?;
                push(Element::Internode, z, 0.0, organ);
            }
            let sheath_base = z + internode as f32;
            let sheath = d.l_sheath * growth;
            let organ = self.symbols.build_stem(&StemSpec {
                tissue_type: stem_tissue,
                length: sheath,
                diameter_base: d.w_sheath,
                diameter_top: d.w_sheath,
            })?;
            push(Element::Sheath, sheath_base, 0.0, organ);

            // Distichous phyllotaxy
            let azimuth = if t.index % 2 == 0 { std::f32::consts::PI } else { 0.0 };
            let collar = sheath_base + sheath as f32;
            let green = 1.0 - senesced;
            let windows = [
                (GREEN_BLADE, 0.0, green),
                (SENESCED_BLADE, green, 1.0),
            ];
            for (tissue_type, s_base, s_top) in windows {
                if s_top - s_base <= 0.0 {
                    continue;
                }
                let spec = LeafSpec {
                    tissue_type,
                    final_length: d.l_blade,
                    length: d.l_blade * growth,
                    radius_max: d.w_blade / 2.0,
                    s_base,
                    s_top,
                    leaf_rank: t.index,
                    seed: leaf_seed(base_seed, inst.id, t.index),
                    insertion_angle: None,
                    shape_index: None,
                };
                let organ = self.symbols.build_leaf(&mut rng, &spec)?;
                push(Element::Blade, collar, azimuth, organ);
            }
            z = sheath_base;
        }
        Ok(out)
    }
}

/// Seed of one leaf, mixing the canopy seed with its instance and phytomer
fn leaf_seed(base_seed: u64, instance: u32, phytomer: u32) -> u64 {
    base_seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(((instance as u64) << 16) | phytomer as u64)
}

/// Orientation of an axis at the base of its plant
///
/// Main stems are vertical; tillers lean outwards, with azimuths spread by
/// their slot numbers.
fn axis_frame(axis: &Axis) -> Isometry3<f32> {
    if axis.is_main_stem() {
        return Isometry3::identity();
    }
    let slots: u32 = axis.position.path().iter().map(|j| j + 1).sum();
    let azimuth = TILLER_AZIMUTH * slots as f32;
    let spin = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), azimuth);
    let lean =
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), TILLER_INCLINATION);
    Isometry3::from_parts(Translation3::identity(), spin * lean)
}

#[cfg(test)]
mod test {
    use super::*;

    fn canopy(db: &LeafShapeDatabase, threads: ThreadCount) -> Canopy<'_> {
        let cfg = PlantgenConfig {
            plants_number: 5,
            ..PlantgenConfig::default()
        };
        let settings = CanopySettings {
            threads,
            ..CanopySettings::default()
        };
        Canopy::new(cfg, db, settings).unwrap()
    }

    #[test]
    fn plants_are_distinct_per_position() {
        let db = LeafShapeDatabase::sample();
        let c = canopy(&db, ThreadCount::One);
        let mut seen = std::collections::BTreeSet::new();
        for inst in &c.instances {
            let pos = c.axes[inst.axis].axis.position.clone();
            assert!(inst.plant < 5);
            assert!(seen.insert((pos, inst.plant)));
        }
        assert_eq!(c.instances.len() as u32, c.population().instances());
    }

    #[test]
    fn nothing_before_emergence() {
        let db = LeafShapeDatabase::sample();
        let c = canopy(&db, ThreadCount::One);
        assert!(c.organs_at(-10.0, 0).unwrap().is_empty());
    }

    #[test]
    fn tissue_types_follow_senescence() {
        let db = LeafShapeDatabase::sample();
        let c = canopy(&db, ThreadCount::One);
        let organs = c.organs_at(1500.0, 3).unwrap();
        assert!(organs.iter().any(|o| o.organ.tissue_type == SENESCED_BLADE));
        assert!(organs.iter().any(|o| o.organ.tissue_type == GREEN_BLADE));
        for o in &organs {
            let expected: &[i32] = match o.element {
                Element::Blade => &[GREEN_BLADE, SENESCED_BLADE],
                _ => &[GREEN_STEM, SENESCED_STEM],
            };
            assert!(expected.contains(&o.organ.tissue_type));
        }
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn parallel_matches_serial() {
        let db = LeafShapeDatabase::sample();
        let serial = canopy(&db, ThreadCount::One).organs_at(900.0, 11).unwrap();
        let n = std::num::NonZeroUsize::new(3).unwrap();
        for threads in [ThreadCount::Global, ThreadCount::Many(n)] {
            let par = canopy(&db, threads).organs_at(900.0, 11).unwrap();
            assert_eq!(serial.len(), par.len());
            for (a, b) in serial.iter().zip(&par) {
                assert_eq!(
                    (a.instance, a.phytomer, a.element),
                    (b.instance, b.phytomer, b.element)
                );
                assert_eq!(a.organ, b.organ);
            }
        }
    }
}
