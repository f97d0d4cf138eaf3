//! Parses a DOT description of the blood-pressure causal graph, lists its
//! nodes and edges and renders it to PNG with Graphviz.

pub mod driver;
mod error;
pub mod parse;
pub mod render;

pub use driver::{run, RenderOutcome, Stage};
pub use error::{DotError, Result};
pub use parse::{parse_dot, ParsedGraph, CAUSAL_GRAPH_DOT};
pub use render::{render_png, verify_output};
