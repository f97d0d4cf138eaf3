use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::DotError;
use crate::parse::{parse_dot, ParsedGraph};
use crate::render::render_png;

pub const DEFAULT_OUTPUT: &str = "test_causal_graph.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Parse => write!(f, "parse"),
            Stage::Render => write!(f, "render"),
        }
    }
}

#[derive(Debug)]
pub enum RenderOutcome {
    Rendered { graph: ParsedGraph, path: PathBuf },
    Failed { stage: Stage, message: String },
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderOutcome::Rendered { .. })
    }
}

fn failed(stage: Stage, err: DotError) -> RenderOutcome {
    warn!(%stage, error = %err, "DOT pipeline failed");
    println!("Failed to {} the graph. Error: {}", stage, err);
    if stage == Stage::Render {
        println!("Check that Graphviz is installed and `dot` is on the PATH.");
    }
    RenderOutcome::Failed {
        stage,
        message: err.to_string(),
    }
}

/// Parses `source`, prints its nodes and edges and renders it to `output`.
///
/// Failures are reported on stdout and in the returned outcome, never raised.
pub fn run(source: &str, output: &Path) -> RenderOutcome {
    println!("Attempting to parse the DOT description...");
    let graph = match parse_dot(source) {
        Ok(graph) => graph,
        Err(err) => return failed(Stage::Parse, err),
    };

    println!("Successfully parsed the graph.");
    println!("Graph nodes: {:?}", graph.nodes);
    println!("Graph edges: {:?}", graph.edge_labels());

    match render_png(&graph, output) {
        Ok(path) => {
            println!("Graph successfully written to {}", path.display());
            println!(
                "File {} exists, Graphviz rendered it successfully.",
                path.display()
            );
            RenderOutcome::Rendered { graph, path }
        }
        Err(err) => failed(Stage::Render, err),
    }
}
