//! Tillering model: which axes exist in the population, and how many
use crate::{
    Error,
    params::{
        EMERGENCE_PROBABILITY_REDUCTION_FACTOR, FIRST_CHILD_DELAY,
        SECONDARY_STEM_LEAVES_NUMBER_COEFFICIENTS,
    },
    plantgen::{Axis, AxisPosition, PlantgenConfig},
};
use log::debug;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

/// Instance counts for one botanical position
#[derive(Clone, Debug, PartialEq)]
pub struct PositionCount {
    /// Botanical position
    pub position: AxisPosition,
    /// Emergence probability of this position
    pub probability: f64,
    /// Number of plants carrying an axis at this position
    pub present: u32,
    /// Number of plants without an axis at this position
    ///
    /// `present + absent` is always the number of plants.
    pub absent: u32,
}

/// Every axis type of a stand, with its cardinality
#[derive(Clone, Debug)]
pub struct AxisPopulation {
    plants_number: u32,
    axes: Vec<Axis>,
    positions: Vec<PositionCount>,
    most_frequent_main_stem: u32,
}

impl AxisPopulation {
    /// Number of plants in the stand
    pub fn plants_number(&self) -> u32 {
        self.plants_number
    }

    /// Axis types with a non-zero cardinality, in emergence order
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Per-position instance counts, in emergence order
    pub fn positions(&self) -> &[PositionCount] {
        &self.positions
    }

    /// Final leaf number of the most frequent main stem
    pub fn most_frequent_main_stem(&self) -> u32 {
        self.most_frequent_main_stem
    }

    /// Total number of axis instances
    pub fn instances(&self) -> u32 {
        self.axes.iter().map(|a| a.cardinality).sum()
    }

    /// Range of cohorts among regressive axes, if there are any
    pub fn regressive_cohorts(&self) -> Option<(u32, u32)> {
        self.axes
            .iter()
            .filter(|a| a.regressive)
            .map(|a| a.cohort())
            .fold(None, |acc, c| match acc {
                None => Some((c, c)),
                Some((lo, hi)) => Some((lo.min(c), hi.max(c))),
            })
    }
}

/// Final leaf number of a tiller, given the main stem's
///
/// This is `a_1 * n_ms - a_2 * cohort_number`, rounded to the nearest integer
/// and never less than 1.  `cohort_number` counts the main stem as 1, see
/// [`AxisPosition::cohort_number`].
pub fn tiller_phytomers(n_ms: u32, cohort_number: u32) -> u32 {
    let c = SECONDARY_STEM_LEAVES_NUMBER_COEFFICIENTS;
    let n = (c.a_1 * n_ms as f64 - c.a_2 * cohort_number as f64).round();
    n.max(1.0) as u32
}

/// Splits `total` units across `weights` so that the counts sum to `total`
///
/// Each slot first gets the floor of its share; the units left over go to the
/// slots with the largest fractional remainders, and ties go to the lower
/// slot index.  Weights must have a positive sum.
pub fn largest_remainder(weights: &[f64], total: u32) -> Vec<u32> {
    let sum: f64 = weights.iter().sum();
    if total == 0 || !(sum > 0.0) {
        return vec![0; weights.len()];
    }
    let shares: Vec<f64> =
        weights.iter().map(|w| w / sum * total as f64).collect();
    let mut counts: Vec<u32> = shares.iter().map(|s| s.floor() as u32).collect();
    let missing = total.saturating_sub(counts.iter().sum()) as usize;

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by_key(|&i| {
        (std::cmp::Reverse(OrderedFloat(shares[i] - shares[i].floor())), i)
    });
    for &i in order.iter().cycle().take(missing) {
        counts[i] += 1;
    }
    counts
}

/// Builds the population of axes described by `config`
///
/// Every plant carries exactly one main stem, so main stem cardinalities sum
/// to the number of plants.  Each tiller position is split between present
/// and absent instances with [`largest_remainder`], which also sums to the
/// number of plants.
///
/// The ear-bearing budget (`ears_density / plants_density` per plant, and at
/// least one per plant) is handed out in emergence order; instances past the
/// budget are regressive.
pub fn derive_axis_population(
    config: &PlantgenConfig,
) -> Result<AxisPopulation, Error> {
    config.validate()?;
    let plants = config.plants_number;

    let ms_variants: Vec<(u32, f64)> = config
        .ms_leaves_number_probabilities
        .iter()
        .map(|(n, p)| (*n, *p))
        .collect();
    let most_frequent_main_stem = ms_variants
        .iter()
        .max_by_key(|(n, p)| (OrderedFloat(*p), std::cmp::Reverse(*n)))
        .map(|(n, _)| *n)
        .ok_or(Error::MissingParameter("ms_leaves_number_probabilities"))?;

    let mut candidates = vec![(AxisPosition::main_stem(), 1.0)];
    enumerate_tillers(
        &AxisPosition::main_stem(),
        1.0,
        &config.tiller_probabilities,
        &mut candidates,
    );
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let ear_budget = (config.ears_per_plant() * plants as f64).round() as u32;
    let mut budget = ear_budget.max(plants);

    let mut axes = vec![];
    let mut positions = vec![];
    for (position, probability) in candidates {
        let (present, absent) = if position.is_main_stem() {
            (plants, 0)
        } else {
            let c = largest_remainder(&[probability, 1.0 - probability], plants);
            (c[0], c[1])
        };
        let non_regressive = present.min(budget);
        budget -= non_regressive;
        let regressive = present - non_regressive;

        // Several main stem variants may lead to the same tiller leaf number
        let groups: Vec<(u32, f64)> = if position.is_main_stem() {
            ms_variants.clone()
        } else {
            let cohort = position.cohort_number();
            let mut merged = BTreeMap::new();
            for (n, w) in &ms_variants {
                *merged.entry(tiller_phytomers(*n, cohort)).or_insert(0.0) += w;
            }
            merged.into_iter().collect()
        };
        let weights: Vec<f64> = groups.iter().map(|(_, w)| *w).collect();

        for (is_regressive, count) in
            [(false, non_regressive), (true, regressive)]
        {
            let split = largest_remainder(&weights, count);
            for ((n, w), c) in groups.iter().zip(split) {
                if c > 0 {
                    axes.push(Axis {
                        position: position.clone(),
                        n_phytomer: *n,
                        regressive: is_regressive,
                        cardinality: c,
                        probability: probability * w,
                    });
                }
            }
        }
        positions.push(PositionCount {
            position,
            probability,
            present,
            absent,
        });
    }
    debug!(
        "derived {} axis types ({} instances) over {} positions for {} plants",
        axes.len(),
        axes.iter().map(|a| a.cardinality).sum::<u32>(),
        positions.len(),
        plants
    );

    Ok(AxisPopulation {
        plants_number: plants,
        axes,
        positions,
        most_frequent_main_stem,
    })
}

/// Recursively collects child positions with a non-zero emergence probability
///
/// A primary tiller `Tj` uses the table entry for `j` directly.  Deeper
/// tillers multiply their parent's probability by `(1 - R) * p(Tk)`, where
/// `Tk` is the primary tiller of their own cohort: `T1.0` shares its cohort
/// with `T3`, and is missing if `T3` has no entry.
fn enumerate_tillers(
    parent: &AxisPosition,
    parent_probability: f64,
    table: &BTreeMap<u32, f64>,
    out: &mut Vec<(AxisPosition, f64)>,
) {
    for j in 0.. {
        let child = parent.child(j);
        // Cohorts increase with the slot index, so nothing further can emerge
        if child.cohort_offset().is_none() {
            break;
        }
        let primary = child.cohort() - FIRST_CHILD_DELAY;
        let p_k = table.get(&primary).copied().unwrap_or(0.0);
        let p = if parent.is_main_stem() {
            p_k
        } else {
            parent_probability
                * (1.0 - EMERGENCE_PROBABILITY_REDUCTION_FACTOR)
                * p_k
        };
        if p > 0.0 {
            out.push((child.clone(), p));
            enumerate_tillers(&child, p, table, out);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_largest_remainder() {
        assert_eq!(largest_remainder(&[0.9, 0.1], 4), vec![4, 0]);
        assert_eq!(largest_remainder(&[0.5, 0.5], 3), vec![2, 1]);
        assert_eq!(largest_remainder(&[1.0, 1.0, 1.0], 4), vec![2, 1, 1]);
        assert_eq!(largest_remainder(&[0.145, 0.818, 0.037], 100), vec![
            14, 82, 4
        ]);
        assert_eq!(largest_remainder(&[0.2, 0.8], 0), vec![0, 0]);
        for total in 0..200 {
            let c = largest_remainder(&[0.13, 0.27, 0.6, 0.0], total);
            assert_eq!(c.iter().sum::<u32>(), total);
            assert_eq!(c[3], 0);
        }
    }

    #[test]
    fn main_stem_sums_to_plants() {
        for plants in 1..60 {
            let cfg = PlantgenConfig {
                plants_number: plants,
                ..PlantgenConfig::default()
            };
            let pop = derive_axis_population(&cfg).unwrap();
            let ms: u32 = pop
                .axes()
                .iter()
                .filter(|a| a.is_main_stem())
                .map(|a| a.cardinality)
                .sum();
            assert_eq!(ms, plants);
            for p in pop.positions() {
                assert_eq!(p.present + p.absent, plants);
                let n: u32 = pop
                    .axes()
                    .iter()
                    .filter(|a| a.position == p.position)
                    .map(|a| a.cardinality)
                    .sum();
                assert_eq!(n, p.present, "bad count for {}", p.position);
            }
            assert!(pop.axes().iter().all(|a| a.cardinality > 0));
        }
    }

    fn position<'a>(pop: &'a AxisPopulation, name: &str) -> Option<&'a PositionCount> {
        pop.positions().iter().find(|p| p.position.to_string() == name)
    }

    #[test]
    fn secondary_probability() {
        let cfg = PlantgenConfig::default();
        let pop = derive_axis_population(&cfg).unwrap();
        let r = EMERGENCE_PROBABILITY_REDUCTION_FACTOR;

        // Each secondary step uses the primary tiller of the child's cohort
        let t1_0 = position(&pop, "T1.0").unwrap();
        assert_relative_eq!(t1_0.probability, 0.900 * (1.0 - r) * 0.817);
        let t1_1 = position(&pop, "T1.1").unwrap();
        assert_relative_eq!(t1_1.probability, 0.900 * (1.0 - r) * 0.117);
        let t2_0 = position(&pop, "T2.0").unwrap();
        assert_relative_eq!(t2_0.probability, 0.983 * (1.0 - r) * 0.117);

        // T0 has probability 0, and cohorts past T4 have no entry
        assert!(position(&pop, "T0").is_none());
        assert!(position(&pop, "T1.0.0").is_none());
        assert!(position(&pop, "T4.4").is_none());
        assert!(position(&pop, "T1.1.1.1").is_none());
        for p in pop.positions() {
            assert!(p.position.cohort() <= 6, "unexpected {}", p.position);
        }
    }

    #[test]
    fn deep_secondary_probability() {
        let mut cfg = PlantgenConfig::default();
        cfg.tiller_probabilities.insert(5, 0.5);
        let pop = derive_axis_population(&cfg).unwrap();
        let r = EMERGENCE_PROBABILITY_REDUCTION_FACTOR;
        let t = position(&pop, "T1.0.0").unwrap();
        assert_relative_eq!(
            t.probability,
            0.900 * (1.0 - r) * 0.817 * (1.0 - r) * 0.5
        );
    }

    #[test]
    fn missing_cohort_is_pruned() {
        let mut cfg = PlantgenConfig::default();
        cfg.tiller_probabilities.remove(&2);
        let pop = derive_axis_population(&cfg).unwrap();
        // T2 and every secondary tiller of its cohort are gone
        assert!(pop.positions().iter().all(|p| p.position.cohort() != 4));
        assert!(position(&pop, "T1.0").is_some());
    }

    #[test]
    fn regressive_after_budget() {
        let cfg = PlantgenConfig {
            plants_number: 10,
            ears_density: 250.0,
            ..PlantgenConfig::default()
        };
        let pop = derive_axis_population(&cfg).unwrap();
        // One ear per plant: every main stem, and nothing else
        for a in pop.axes() {
            assert_eq!(a.regressive, !a.is_main_stem());
        }
        assert!(pop.regressive_cohorts().is_some());
    }

    #[test]
    fn most_frequent_main_stem() {
        let pop = derive_axis_population(&PlantgenConfig::default()).unwrap();
        assert_eq!(pop.most_frequent_main_stem(), 11);

        let mut cfg = PlantgenConfig::default();
        cfg.ms_leaves_number_probabilities =
            [(12, 0.5), (10, 0.5)].into_iter().collect();
        let pop = derive_axis_population(&cfg).unwrap();
        assert_eq!(pop.most_frequent_main_stem(), 10);
    }

    #[test]
    fn tiller_leaf_number() {
        assert_eq!(tiller_phytomers(11, 4), 8); // 10.3653 - 2.22
        assert_eq!(tiller_phytomers(1, 10), 1);

        // T1 on an 11-leaf main stem is cohort number 4
        let cfg = PlantgenConfig {
            ms_leaves_number_probabilities: [(11, 1.0)].into_iter().collect(),
            ..PlantgenConfig::default()
        };
        let pop = derive_axis_population(&cfg).unwrap();
        let t1 = AxisPosition::primary(1);
        assert!(pop.axes().iter().filter(|a| a.position == t1).all(|a| a.n_phytomer == 8));
    }
}
