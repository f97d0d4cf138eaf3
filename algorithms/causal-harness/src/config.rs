//! Run configuration for the causal analysis.
//!
//! Resolution order (highest priority first):
//! 1. CLI flags
//! 2. TOML file passed with `--config`
//! 3. Compiled defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::{BLOOD_PRESSURE, DEFAULT_SAMPLES, DRUG_DOSAGE, EXERCISE_HOURS, SODIUM_INTAKE};
use crate::error::{CausalError, Result};
use crate::identifier::IdentifyPolicy;
use crate::refuter::{PlaceboType, DEFAULT_SIMULATIONS};

pub const DEFAULT_SEED: u64 = 42;

/// What the driver does after one treatment's analysis fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure and continue with the remaining treatments.
    #[default]
    Isolate,
    /// Stop at the first failure.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefutationConfig {
    pub num_simulations: usize,
    pub placebo_type: PlaceboType,
}

impl Default for RefutationConfig {
    fn default() -> Self {
        RefutationConfig {
            num_simulations: DEFAULT_SIMULATIONS,
            placebo_type: PlaceboType::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub seed: u64,
    pub num_samples: usize,
    pub show_graph: bool,
    pub treatments: Vec<String>,
    pub outcome: String,
    pub identification: IdentifyPolicy,
    pub refutation: RefutationConfig,
    pub failure_policy: FailurePolicy,
    pub graph_output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            seed: DEFAULT_SEED,
            num_samples: DEFAULT_SAMPLES,
            show_graph: false,
            treatments: [DRUG_DOSAGE, EXERCISE_HOURS, SODIUM_INTAKE]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            outcome: BLOOD_PRESSURE.to_string(),
            identification: IdentifyPolicy::default(),
            refutation: RefutationConfig::default(),
            failure_policy: FailurePolicy::default(),
            graph_output_dir: PathBuf::from("."),
        }
    }
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub seed: Option<u64>,
    pub num_samples: Option<usize>,
    pub show_graph: bool,
    pub num_simulations: Option<usize>,
}

impl AnalysisConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| CausalError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Defaults, overlaid with `path` when given, overlaid with `overrides`.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| CausalError::Config {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Self::from_toml(&text, path)?
            }
            None => Self::default(),
        };
        config.apply_cli_overrides(overrides);
        Ok(config)
    }

    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(num_samples) = overrides.num_samples {
            self.num_samples = num_samples;
        }
        if let Some(num_simulations) = overrides.num_simulations {
            self.refutation.num_simulations = num_simulations;
        }
        self.show_graph |= overrides.show_graph;
    }
}
