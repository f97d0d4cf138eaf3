//! Robustness checks that perturb the data and re-estimate the effect.
//!
//! Both refuters are informational: they report how the estimate moves, they
//! never reject it.

use std::fmt;

use ndarray::{Array1, ArrayView1};
use ndarray_rand::rand_distr::{Normal, StandardNormal};
use ndarray_rand::RandomExt;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::ContinuousCDF;
use tracing::debug;

use crate::data::ObservationTable;
use crate::error::{CausalError, Result};
use crate::estimator::{fit_effect, CausalEstimate};

pub const DEFAULT_SIMULATIONS: usize = 100;

/// How the placebo treatment is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceboType {
    /// Normal draws matching the treatment's mean and standard deviation.
    #[default]
    RandomData,
    /// A random permutation of the treatment column.
    Permute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefutationKind {
    PlaceboTreatment,
    RandomCommonCause,
}

impl fmt::Display for RefutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefutationKind::PlaceboTreatment => write!(f, "Use a Placebo Treatment"),
            RefutationKind::RandomCommonCause => write!(f, "Add a random common cause"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefutationResult {
    pub kind: RefutationKind,
    pub estimated_effect: f64,
    /// Mean effect over the simulations.
    pub new_effect: f64,
    pub new_effect_std: f64,
    /// Two-sided probability of the original estimate under the simulated effects.
    pub p_value: f64,
    pub num_simulations: usize,
}

impl fmt::Display for RefutationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Refute: {}", self.kind)?;
        writeln!(f, "Estimated effect:{}", self.estimated_effect)?;
        writeln!(f, "New effect:{}", self.new_effect)?;
        write!(f, "p value:{}", self.p_value)
    }
}

impl RefutationResult {
    fn from_simulations(
        kind: RefutationKind,
        estimated_effect: f64,
        effects: &[f64],
    ) -> Result<Self> {
        let effects = Array1::from(effects.to_vec());
        let new_effect = effects.mean().unwrap_or(f64::NAN);
        let new_effect_std = if effects.len() > 1 {
            effects.std(1.0)
        } else {
            0.0
        };

        let p_value = if new_effect_std > 0.0 {
            let z = (estimated_effect - new_effect) / new_effect_std;
            let standard = statrs::distribution::Normal::new(0.0, 1.0)
                .map_err(|e| CausalError::Distribution(e.to_string()))?;
            (2.0 * (1.0 - standard.cdf(z.abs()))).clamp(0.0, 1.0)
        } else if (estimated_effect - new_effect).abs() <= f64::EPSILON {
            1.0
        } else {
            0.0
        };

        Ok(RefutationResult {
            kind,
            estimated_effect,
            new_effect,
            new_effect_std,
            p_value,
            num_simulations: effects.len(),
        })
    }
}

pub trait Refuter {
    fn refute<R: Rng>(
        &self,
        table: &ObservationTable,
        estimate: &CausalEstimate,
        rng: &mut R,
    ) -> Result<RefutationResult>;
}

fn adjustment_columns<'a>(
    table: &'a ObservationTable,
    estimate: &CausalEstimate,
) -> Result<Vec<ArrayView1<'a, f64>>> {
    estimate
        .adjustment_set
        .iter()
        .map(|name| table.column(name))
        .collect()
}

/// Replaces the treatment with a variable independent of everything else.
#[derive(Debug, Clone, Copy)]
pub struct PlaceboTreatmentRefuter {
    pub placebo_type: PlaceboType,
    pub num_simulations: usize,
}

impl Default for PlaceboTreatmentRefuter {
    fn default() -> Self {
        PlaceboTreatmentRefuter {
            placebo_type: PlaceboType::default(),
            num_simulations: DEFAULT_SIMULATIONS,
        }
    }
}

impl Refuter for PlaceboTreatmentRefuter {
    fn refute<R: Rng>(
        &self,
        table: &ObservationTable,
        estimate: &CausalEstimate,
        rng: &mut R,
    ) -> Result<RefutationResult> {
        let treatment = table.column(&estimate.treatment)?;
        let outcome = table.column(&estimate.outcome)?;
        let covariates = adjustment_columns(table, estimate)?;

        let placebo_dist = match self.placebo_type {
            PlaceboType::RandomData => {
                let mean = treatment.mean().unwrap_or(0.0);
                let std_dev = if treatment.len() > 1 {
                    treatment.std(1.0)
                } else {
                    1.0
                };
                Some(
                    Normal::new(mean, std_dev)
                        .map_err(|e| CausalError::Distribution(e.to_string()))?,
                )
            }
            PlaceboType::Permute => None,
        };

        let mut effects = Vec::with_capacity(self.num_simulations);
        for _ in 0..self.num_simulations.max(1) {
            let placebo = match placebo_dist {
                Some(dist) => Array1::random_using(treatment.len(), dist, rng),
                None => {
                    let mut values = treatment.to_vec();
                    values.shuffle(rng);
                    Array1::from(values)
                }
            };
            let fit = fit_effect(placebo.view(), &covariates, outcome)?;
            effects.push(fit.treatment_coefficient);
        }

        let result = RefutationResult::from_simulations(
            RefutationKind::PlaceboTreatment,
            estimate.value,
            &effects,
        )?;
        debug!(
            treatment = %estimate.treatment,
            new_effect = result.new_effect,
            p_value = result.p_value,
            "placebo refutation"
        );
        Ok(result)
    }
}

/// Adds an independent standard-normal covariate to the adjustment set.
#[derive(Debug, Clone, Copy)]
pub struct RandomCommonCauseRefuter {
    pub num_simulations: usize,
}

impl Default for RandomCommonCauseRefuter {
    fn default() -> Self {
        RandomCommonCauseRefuter {
            num_simulations: DEFAULT_SIMULATIONS,
        }
    }
}

impl Refuter for RandomCommonCauseRefuter {
    fn refute<R: Rng>(
        &self,
        table: &ObservationTable,
        estimate: &CausalEstimate,
        rng: &mut R,
    ) -> Result<RefutationResult> {
        let treatment = table.column(&estimate.treatment)?;
        let outcome = table.column(&estimate.outcome)?;
        let covariates = adjustment_columns(table, estimate)?;

        let mut effects = Vec::with_capacity(self.num_simulations);
        for _ in 0..self.num_simulations.max(1) {
            let common_cause = Array1::<f64>::random_using(treatment.len(), StandardNormal, rng);
            let mut augmented: Vec<ArrayView1<'_, f64>> =
                covariates.iter().map(|c| c.view()).collect();
            augmented.push(common_cause.view());
            let fit = fit_effect(treatment, &augmented, outcome)?;
            effects.push(fit.treatment_coefficient);
        }

        let result = RefutationResult::from_simulations(
            RefutationKind::RandomCommonCause,
            estimate.value,
            &effects,
        )?;
        debug!(
            treatment = %estimate.treatment,
            new_effect = result.new_effect,
            p_value = result.p_value,
            "random common cause refutation"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{self, BLOOD_PRESSURE, DRUG_DOSAGE, SODIUM_INTAKE};
    use crate::estimator::{Estimator, LinearRegressionEstimator};
    use crate::graph::blood_pressure_graph;
    use crate::identifier::{BackdoorIdentifier, Identifier};
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn estimate_for(table: &ObservationTable, treatment: &'static str) -> CausalEstimate {
        let graph = blood_pressure_graph();
        let estimand = BackdoorIdentifier::default()
            .identify(&graph, &treatment, &BLOOD_PRESSURE)
            .unwrap();
        LinearRegressionEstimator.estimate(table, &estimand).unwrap()
    }

    #[test]
    fn test_placebo_shrinks_effect() {
        let table = data::with_seed(42, 1000).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        for treatment in [DRUG_DOSAGE, SODIUM_INTAKE] {
            let estimate = estimate_for(&table, treatment);
            for placebo_type in [PlaceboType::RandomData, PlaceboType::Permute] {
                let refuter = PlaceboTreatmentRefuter {
                    placebo_type,
                    num_simulations: 20,
                };
                let result = refuter.refute(&table, &estimate, &mut rng).unwrap();
                assert_eq!(result.num_simulations, 20);
                assert!(
                    result.new_effect.abs() < estimate.value.abs(),
                    "{treatment} {placebo_type:?}: {} vs {}",
                    result.new_effect,
                    estimate.value
                );
            }
        }
    }

    #[test]
    fn test_random_common_cause_keeps_effect() {
        let table = data::with_seed(42, 1000).unwrap();
        let estimate = estimate_for(&table, DRUG_DOSAGE);
        assert_eq!(estimate.adjustment_set, vec!["Age"]);
        let mut rng = SmallRng::seed_from_u64(1);
        let result = RandomCommonCauseRefuter { num_simulations: 20 }
            .refute(&table, &estimate, &mut rng)
            .unwrap();
        assert_abs_diff_eq!(result.new_effect, estimate.value, epsilon = 0.05);
        assert!(result.p_value > 0.05);
    }

    #[test]
    fn test_p_value_of_identical_simulations() {
        let same =
            RefutationResult::from_simulations(RefutationKind::PlaceboTreatment, 1.0, &[1.0, 1.0])
                .unwrap();
        assert_eq!(same.p_value, 1.0);
        let different =
            RefutationResult::from_simulations(RefutationKind::PlaceboTreatment, 2.0, &[1.0, 1.0])
                .unwrap();
        assert_eq!(different.p_value, 0.0);
    }

    #[test]
    fn test_display() {
        let result = RefutationResult::from_simulations(
            RefutationKind::RandomCommonCause,
            -2.0,
            &[-2.0, -1.9, -2.1],
        )
        .unwrap();
        let text = result.to_string();
        assert!(text.starts_with("Refute: Add a random common cause"));
        assert!(text.contains("Estimated effect:-2"));
    }
}
