use dot_structures::{EdgeTy, Graph, Id, NodeId, Stmt, Vertex};
use tracing::debug;

use crate::error::{DotError, Result};

/// Causal graph over the blood-pressure variables.
pub const CAUSAL_GRAPH_DOT: &str = r#"
digraph G {
    # declare every node explicitly
    Age;
    DrugDosage;
    ExerciseHours;
    SodiumIntake;
    BloodPressure;

    # then the edges
    Age -> DrugDosage;
    Age -> ExerciseHours;
    Age -> BloodPressure;
    DrugDosage -> BloodPressure;
    ExerciseHours -> BloodPressure;
    SodiumIntake -> BloodPressure;
}
"#;

/// Drops lines starting with `#`, which Graphviz treats as preprocessor output.
pub fn strip_preprocessor_lines(source: &str) -> String {
    source
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A parsed DOT graph with its declared nodes and edges.
#[derive(Debug, Clone)]
pub struct ParsedGraph {
    pub name: String,
    pub directed: bool,
    /// Nodes declared by node statements, in source order.
    pub nodes: Vec<String>,
    /// (source, destination) pairs, chains expanded pairwise.
    pub edges: Vec<(String, String)>,
    graph: Graph,
}

impl ParsedGraph {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn edge_labels(&self) -> Vec<String> {
        self.edges
            .iter()
            .map(|(source, destination)| format!("{} -> {}", source, destination))
            .collect()
    }
}

fn id_name(id: &Id) -> String {
    match id {
        Id::Escaped(s) => s.trim_matches('"').to_string(),
        Id::Html(s) | Id::Plain(s) | Id::Anonymous(s) => s.clone(),
    }
}

fn vertex_names(vertex: &Vertex) -> Vec<String> {
    match vertex {
        Vertex::N(NodeId(id, _)) => vec![id_name(id)],
        Vertex::S(subgraph) => {
            let mut nodes = vec![];
            collect(&subgraph.stmts, &mut nodes, &mut vec![]);
            nodes
        }
    }
}

fn collect(stmts: &[Stmt], nodes: &mut Vec<String>, edges: &mut Vec<(String, String)>) {
    for stmt in stmts {
        match stmt {
            Stmt::Node(node) => nodes.push(id_name(&node.id.0)),
            Stmt::Edge(edge) => {
                let vertices: Vec<&Vertex> = match &edge.ty {
                    EdgeTy::Pair(a, b) => vec![a, b],
                    EdgeTy::Chain(chain) => chain.iter().collect(),
                };
                for pair in vertices.windows(2) {
                    for source in vertex_names(pair[0]) {
                        for destination in vertex_names(pair[1]) {
                            edges.push((source.clone(), destination));
                        }
                    }
                }
            }
            Stmt::Subgraph(subgraph) => collect(&subgraph.stmts, nodes, edges),
            _ => {}
        }
    }
}

pub fn parse_dot(source: &str) -> Result<ParsedGraph> {
    let cleaned = strip_preprocessor_lines(source);
    if cleaned.trim().is_empty() {
        return Err(DotError::Empty);
    }

    let graph = graphviz_rust::parse(&cleaned).map_err(DotError::Parse)?;
    let (id, directed, stmts) = match &graph {
        Graph::Graph { id, stmts, .. } => (id, false, stmts),
        Graph::DiGraph { id, stmts, .. } => (id, true, stmts),
    };

    let mut nodes = vec![];
    let mut edges = vec![];
    collect(stmts, &mut nodes, &mut edges);
    debug!(nodes = nodes.len(), edges = edges.len(), "parsed DOT graph");

    Ok(ParsedGraph {
        name: id_name(id),
        directed,
        nodes,
        edges,
        graph,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_causal_graph() {
        let parsed = parse_dot(CAUSAL_GRAPH_DOT).unwrap();
        assert_eq!(parsed.name, "G");
        assert!(parsed.directed);
        assert_eq!(
            parsed.nodes,
            vec!["Age", "DrugDosage", "ExerciseHours", "SodiumIntake", "BloodPressure"]
        );
        assert_eq!(
            parsed.edge_labels(),
            vec![
                "Age -> DrugDosage",
                "Age -> ExerciseHours",
                "Age -> BloodPressure",
                "DrugDosage -> BloodPressure",
                "ExerciseHours -> BloodPressure",
                "SodiumIntake -> BloodPressure",
            ]
        );
    }

    #[test]
    fn test_chain_expanded() {
        let parsed = parse_dot("digraph { a -> b -> c; }").unwrap();
        assert!(parsed.nodes.is_empty());
        assert_eq!(
            parsed.edges,
            vec![
                ("a".to_string(), "b".to_string()),
                ("b".to_string(), "c".to_string())
            ]
        );
    }

    #[test]
    fn test_quoted_ids() {
        let parsed = parse_dot(r#"graph "causal" { "Blood Pressure"; }"#).unwrap();
        assert!(!parsed.directed);
        assert_eq!(parsed.name, "causal");
        assert_eq!(parsed.nodes, vec!["Blood Pressure"]);
    }

    #[test]
    fn test_preprocessor_lines_dropped() {
        assert_eq!(strip_preprocessor_lines("# a\nx;\n  # b\ny;"), "x;\ny;");
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            parse_dot("digraph G { Age -> ; "),
            Err(DotError::Parse(_))
        ));
        assert!(matches!(parse_dot("  # only a comment\n"), Err(DotError::Empty)));
    }
}
