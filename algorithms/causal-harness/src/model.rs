use std::fs;
use std::path::{Path, PathBuf};

use graphviz_rust::cmd::{CommandArg, Format};
use graphviz_rust::exec_dot;
use rand::Rng;
use tracing::{info, warn};

use crate::admg::ADMG;
use crate::data::ObservationTable;
use crate::error::{CausalError, Location, Result};
use crate::estimator::{CausalEstimate, Estimator};
use crate::identifier::{BackdoorIdentifier, IdentifiedEstimand, IdentifyPolicy, Identifier};
use crate::refuter::{RefutationResult, Refuter};

/// Observations, assumed causal structure and the effect of interest.
pub struct CausalModel<'a> {
    data: &'a ObservationTable,
    causal_graph: &'a ADMG<&'a str>,
    treatment: &'a str,
    outcome: &'a str,
}

impl<'a> CausalModel<'a> {
    /// Binds the model, failing when a variable is missing from the graph or the table.
    pub fn new(
        data: &'a ObservationTable,
        causal_graph: &'a ADMG<&'a str>,
        treatment: &'a str,
        outcome: &'a str,
    ) -> Result<CausalModel<'a>> {
        if treatment == outcome {
            return Err(CausalError::TreatmentIsOutcome(treatment.to_string()));
        }
        for name in [treatment, outcome] {
            if !causal_graph.contains(&name) {
                return Err(CausalError::unknown(name, Location::Graph));
            }
            data.column_index(name)?;
        }

        Ok(CausalModel {
            data,
            causal_graph,
            treatment,
            outcome,
        })
    }

    pub fn treatment(&self) -> &'a str {
        self.treatment
    }

    pub fn outcome(&self) -> &'a str {
        self.outcome
    }

    pub fn identify_effect(&self, policy: IdentifyPolicy) -> Result<IdentifiedEstimand<&'a str>> {
        BackdoorIdentifier::new(policy).identify(self.causal_graph, &self.treatment, &self.outcome)
    }

    pub fn estimate_effect<E: Estimator>(
        &self,
        estimand: &IdentifiedEstimand<&str>,
        estimator: &E,
    ) -> Result<CausalEstimate> {
        estimator.estimate(self.data, estimand)
    }

    pub fn refute_estimate<F: Refuter, R: Rng>(
        &self,
        estimate: &CausalEstimate,
        refuter: &F,
        rng: &mut R,
    ) -> Result<RefutationResult> {
        refuter.refute(self.data, estimate, rng)
    }

    /// Writes the graph as DOT into `dir` and asks Graphviz for a PNG next to it.
    ///
    /// Returns the PNG path, or the DOT path when Graphviz is unavailable.
    pub fn view_model(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let stem = format!("{}_causal_model", self.treatment);
        let dot_path = dir.join(format!("{stem}.dot"));
        let png_path = dir.join(format!("{stem}.png"));

        let dot = self.causal_graph.to_dot("causal_model");
        fs::write(&dot_path, &dot)?;

        let rendered = exec_dot(
            dot,
            vec![
                Format::Png.into(),
                CommandArg::Output(png_path.display().to_string()),
            ],
        );
        match rendered {
            Ok(_) if png_path.exists() => {
                info!(path = %png_path.display(), "rendered causal model");
                Ok(png_path)
            }
            Ok(_) => {
                warn!(path = %png_path.display(), "graphviz did not write the causal model image");
                Ok(dot_path)
            }
            Err(err) => {
                warn!(error = %err, "graphviz could not render the causal model");
                Ok(dot_path)
            }
        }
    }
}
