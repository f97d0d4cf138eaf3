//! # Causal analysis harness
//!
//! Synthesizes a blood-pressure dataset from an explicitly seeded generator,
//! builds a fixed causal graph over its five variables and, for each treatment,
//! identifies the effect on the outcome, estimates it with a backdoor-adjusted
//! linear regression and refutes the estimate with a placebo treatment and a
//! random common cause.
//!
//! ```no_run
//! use causal_harness::prelude::*;
//!
//! let table = causal_harness::data::with_seed(42, 1000)?;
//! let graph = blood_pressure_graph();
//! let model = CausalModel::new(&table, &graph, "DrugDosage", "BloodPressure")?;
//! let estimand = model.identify_effect(IdentifyPolicy::ProceedWhenUnidentifiable)?;
//! let estimate = model.estimate_effect(&estimand, &LinearRegressionEstimator)?;
//! println!("{}", estimate.value);
//! # Ok::<(), causal_harness::CausalError>(())
//! ```

pub mod admg;
pub mod config;
pub mod data;
pub mod driver;
mod error;
pub mod estimator;
pub mod graph;
pub mod identifier;
pub mod model;
pub mod refuter;
mod setutils;

pub use error::{CausalError, Location, Result};

pub mod prelude {
    pub use crate::admg::ADMG;
    pub use crate::config::{AnalysisConfig, FailurePolicy};
    pub use crate::data::ObservationTable;
    pub use crate::estimator::{CausalEstimate, Estimator, LinearRegressionEstimator};
    pub use crate::graph::{blood_pressure_graph, CausalGraph};
    pub use crate::identifier::{IdentifiedEstimand, IdentifyPolicy, Identifier};
    pub use crate::model::CausalModel;
    pub use crate::refuter::{
        PlaceboTreatmentRefuter, PlaceboType, RandomCommonCauseRefuter, RefutationResult, Refuter,
    };
}
