use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CausalError>;

/// Where a variable name was looked up when it could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Graph,
    Table,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Graph => write!(f, "causal graph"),
            Location::Table => write!(f, "observation table"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CausalError {
    #[error("variable `{name}` is not present in the {location}")]
    UnknownVariable { name: String, location: Location },
    #[error("treatment and outcome must differ, both are `{0}`")]
    TreatmentIsOutcome(String),
    #[error("Detected cycle in topological ordering")]
    Cycle,
    #[error("Self reference bidirected edges within node are not allowed")]
    SelfBidirected,
    #[error("Hedge found")]
    Hedge,
    #[error("identification reached an unreachable state")]
    Unidentifiable,
    #[error("linear regression failed: {0}")]
    Regression(String),
    #[error("invalid distribution parameters: {0}")]
    Distribution(String),
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error(transparent)]
    Layout(#[from] ndarray::ShapeError),
    #[error("not enough observations ({0}) to estimate an effect")]
    NotEnoughObservations(usize),
    #[error("failed to read config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CausalError {
    pub(crate) fn unknown(name: &str, location: Location) -> Self {
        CausalError::UnknownVariable {
            name: name.to_string(),
            location,
        }
    }
}
