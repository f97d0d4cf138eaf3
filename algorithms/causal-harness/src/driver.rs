use std::path::PathBuf;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{error, info, info_span};

use crate::config::{AnalysisConfig, FailurePolicy};
use crate::data::{self, ObservationTable};
use crate::error::Result;
use crate::estimator::{CausalEstimate, LinearRegressionEstimator};
use crate::graph::{blood_pressure_graph, CausalGraph};
use crate::identifier::IdentifiedEstimand;
use crate::model::CausalModel;
use crate::refuter::{PlaceboTreatmentRefuter, RandomCommonCauseRefuter, RefutationResult};

/// Everything produced for one treatment.
#[derive(Debug, Clone)]
pub struct TreatmentAnalysis {
    pub estimand: IdentifiedEstimand<String>,
    pub estimate: CausalEstimate,
    pub placebo: RefutationResult,
    pub random_common_cause: RefutationResult,
    pub model_view: Option<PathBuf>,
}

#[derive(Debug)]
pub struct TreatmentReport {
    pub treatment: String,
    pub result: Result<TreatmentAnalysis>,
}

fn case_label(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
        _ => (index + 1).to_string(),
    }
}

/// "A one-unit increase" sentence; small effects get more decimals.
pub fn conclusion(estimate: &CausalEstimate) -> String {
    let precision = if estimate.value.abs() < 0.1 { 4 } else { 2 };
    format!(
        "Conclusion: a one-unit increase in {} changes {} by {:.*} units on average",
        estimate.treatment, estimate.outcome, precision, estimate.value
    )
}

fn analyze_treatment(
    table: &ObservationTable,
    graph: &CausalGraph,
    treatment: &str,
    index: usize,
    config: &AnalysisConfig,
) -> Result<TreatmentAnalysis> {
    let model = CausalModel::new(table, graph, treatment, &config.outcome)?;

    println!("\nModel overview for {}:", treatment);
    let model_view = if config.show_graph {
        let path = model.view_model(&config.graph_output_dir)?;
        println!("Causal model written to {}", path.display());
        Some(path)
    } else {
        None
    };

    let estimand = model.identify_effect(config.identification)?;
    println!("\nIdentified estimand for {}:", treatment);
    println!("{}", estimand);

    let estimate = model.estimate_effect(&estimand, &LinearRegressionEstimator)?;
    println!("\nEstimate for {}:", treatment);
    println!("{}", estimate);
    println!("{}", conclusion(&estimate));

    println!("\nRefutation for {}:", treatment);
    // one generator per treatment, independent of the data stream
    let mut rng = SmallRng::seed_from_u64(config.seed.wrapping_add(1 + index as u64));

    let placebo = model.refute_estimate(
        &estimate,
        &PlaceboTreatmentRefuter {
            placebo_type: config.refutation.placebo_type,
            num_simulations: config.refutation.num_simulations,
        },
        &mut rng,
    )?;
    println!("\nPlacebo treatment refuter:");
    println!("{}", placebo);

    let random_common_cause = model.refute_estimate(
        &estimate,
        &RandomCommonCauseRefuter {
            num_simulations: config.refutation.num_simulations,
        },
        &mut rng,
    )?;
    println!("\nRandom common cause refuter:");
    println!("{}", random_common_cause);

    Ok(TreatmentAnalysis {
        estimand: estimand.map(|name| name.to_string()),
        estimate,
        placebo,
        random_common_cause,
        model_view,
    })
}

/// Runs identification, estimation and both refuters for every configured treatment.
///
/// Under [`FailurePolicy::Isolate`] a failing treatment is reported and skipped;
/// under [`FailurePolicy::Abort`] the first failure is returned.
pub fn run_analysis(
    table: &ObservationTable,
    graph: &CausalGraph,
    config: &AnalysisConfig,
) -> Result<Vec<TreatmentReport>> {
    let mut reports = Vec::with_capacity(config.treatments.len());

    for (index, treatment) in config.treatments.iter().enumerate() {
        let _span = info_span!("treatment", %treatment).entered();
        println!(
            "\n\n--- Case {}: effect of {} on {} ---",
            case_label(index),
            treatment,
            config.outcome
        );

        let result = analyze_treatment(table, graph, treatment, index, config);
        let result = match (result, config.failure_policy) {
            (Ok(analysis), _) => {
                info!(value = analysis.estimate.value, "analysis complete");
                Ok(analysis)
            }
            (Err(err), FailurePolicy::Abort) => {
                error!(error = %err, "analysis failed, aborting");
                return Err(err);
            }
            (Err(err), FailurePolicy::Isolate) => {
                error!(error = %err, "analysis failed, continuing with the next treatment");
                println!("Analysis of {} failed: {}", treatment, err);
                Err(err)
            }
        };
        reports.push(TreatmentReport {
            treatment: treatment.clone(),
            result,
        });
    }

    Ok(reports)
}

/// Synthesizes the data, prints it, builds the graph and runs every analysis.
pub fn run_pipeline(config: &AnalysisConfig) -> Result<Vec<TreatmentReport>> {
    println!("--- 1. Generating synthetic data ---");
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let table = data::synthesize(&mut rng, config.num_samples)?;
    println!("First 5 rows:");
    println!("{}", table.head(5));
    println!("Summary:");
    println!("{}", table.describe());

    println!("\n--- 2. Defining the causal graph ---");
    let graph = blood_pressure_graph();
    println!("Nodes: {:?}", graph.nodes());
    println!("Edges: {:?}", graph.directed_edges());

    run_analysis(&table, &graph, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.num_samples = 300;
        config.refutation.num_simulations = 5;
        config
    }

    #[test]
    fn test_case_labels() {
        assert_eq!(case_label(0), "A");
        assert_eq!(case_label(2), "C");
        assert_eq!(case_label(30), "31");
    }

    #[test]
    fn test_isolated_failure_keeps_other_treatments() {
        let mut config = quick_config();
        config.treatments.insert(1, "Cholesterol".to_string());
        let table = data::with_seed(config.seed, config.num_samples).unwrap();
        let graph = blood_pressure_graph();

        let reports = run_analysis(&table, &graph, &config).unwrap();
        assert_eq!(reports.len(), 4);
        assert!(reports[0].result.is_ok());
        assert!(reports[1].result.is_err());
        assert!(reports[2].result.is_ok());
        assert!(reports[3].result.is_ok());
    }

    #[test]
    fn test_abort_policy_stops() {
        let mut config = quick_config();
        config.failure_policy = FailurePolicy::Abort;
        config.treatments.insert(0, "Cholesterol".to_string());
        let table = data::with_seed(config.seed, config.num_samples).unwrap();
        let graph = blood_pressure_graph();

        assert!(run_analysis(&table, &graph, &config).is_err());
    }

    #[test]
    fn test_conclusion_precision() {
        let table = data::with_seed(42, 300).unwrap();
        let graph = blood_pressure_graph();
        let reports = run_analysis(&table, &graph, &quick_config()).unwrap();

        let drug = reports[0].result.as_ref().unwrap();
        let expected = format!("{:.2} units on average", drug.estimate.value);
        assert!(conclusion(&drug.estimate).ends_with(&expected));

        let sodium = reports[2].result.as_ref().unwrap();
        assert!(conclusion(&sodium.estimate).contains(&format!("{:.4}", sodium.estimate.value)));
    }
}
