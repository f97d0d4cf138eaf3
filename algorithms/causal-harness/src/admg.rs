use crate::error::{CausalError, Result};
use crate::setutils::{self, OrderedSet};
use petgraph::graph::UnGraph;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::Dfs;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

pub(crate) type Graph<T> = StableGraph<T, ()>;

/// Bounds every node weight of a causal graph has to satisfy.
pub trait Variable: Clone + Eq + Hash + Ord + Debug {}

impl<T> Variable for T where T: Clone + Eq + Hash + Ord + Debug {}

#[derive(Clone, Debug)]
struct BidirectedEdge<T: Variable> {
    node1: T,
    node2: T,
}

/// Acyclic directed mixed graph.
/// This graph is use to specify a causal model it can contains directed edges
/// specifying causal relations in a directed acyclic graph or bidirected edges
/// for unobserved or unknown relations.
#[derive(Clone, Debug)]
pub struct ADMG<T: Variable> {
    graph: Graph<T>,
    bidirected_edges: Vec<BidirectedEdge<T>>,
}

impl<T: Variable> Deref for ADMG<T> {
    type Target = Graph<T>;

    fn deref(&self) -> &Self::Target {
        &self.graph
    }
}

impl<T: Variable> DerefMut for ADMG<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.graph
    }
}

impl<T: Variable> Default for ADMG<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Variable> ADMG<T> {
    pub fn new() -> Self {
        ADMG {
            graph: Graph::new(),
            bidirected_edges: vec![],
        }
    }

    pub fn graph(&self) -> &Graph<T> {
        &self.graph
    }

    pub fn add_bidirected_edge(&mut self, node1: T, node2: T) -> Result<()> {
        if node1 == node2 {
            return Err(CausalError::SelfBidirected);
        }

        self.bidirected_edges.push(BidirectedEdge { node1, node2 });

        Ok(())
    }

    pub fn bidirected_edges(&self) -> impl Iterator<Item = (&T, &T)> + '_ {
        self.bidirected_edges
            .iter()
            .map(|edge| (&edge.node1, &edge.node2))
    }

    /// Index of the node carrying `weight`, if any.
    pub fn node_index(&self, weight: &T) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|i| self.graph.node_weight(*i) == Some(weight))
    }

    pub fn contains(&self, weight: &T) -> bool {
        self.node_index(weight).is_some()
    }

    /// Node weights in insertion order.
    pub fn nodes(&self) -> Vec<&T> {
        self.graph
            .node_indices()
            .filter_map(|i| self.graph.node_weight(i))
            .collect()
    }

    /// Directed edges as (source, target) weight pairs in insertion order.
    pub fn directed_edges(&self) -> Vec<(&T, &T)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| {
                let (source, target) = self.graph.edge_endpoints(edge)?;
                Some((self.graph.node_weight(source)?, self.graph.node_weight(target)?))
            })
            .collect()
    }

    pub fn parents(&self, node: NodeIndex) -> OrderedSet<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .collect()
    }

    pub fn c_components(&self, topo_order: &[NodeIndex]) -> Vec<OrderedSet<NodeIndex>> {
        let mut ug: UnGraph<T, ()> =
            UnGraph::with_capacity(self.graph().node_count(), self.bidirected_edges.len());
        let mut node2index: BTreeMap<&T, NodeIndex> = BTreeMap::new();
        let mut new_index2index: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        for node_index in topo_order {
            if let Some(w) = self.graph().node_weight(*node_index) {
                let i = ug.add_node(w.clone());
                node2index.insert(w, i);
                new_index2index.insert(i, *node_index);
            }
        }

        // bidirected edges survive subgraph extraction, only keep those with both ends present
        for edge in self.bidirected_edges.iter() {
            if let (Some(n1), Some(n2)) = (node2index.get(&edge.node1), node2index.get(&edge.node2))
            {
                ug.add_edge(*n1, *n2, ());
            }
        }

        let mut c_components = vec![];
        let mut visited: OrderedSet<NodeIndex> = OrderedSet::new();

        for new_index in node2index.values() {
            if visited.contains(new_index) {
                continue;
            }
            let mut component: OrderedSet<NodeIndex> = OrderedSet::new();
            let mut dfs = Dfs::new(&ug, *new_index);
            while let Some(nx) = dfs.next(&ug) {
                visited.insert(nx);
                if let Some(original) = new_index2index.get(&nx) {
                    component.insert(*original);
                }
            }
            c_components.push(component);
        }

        c_components
    }

    /// Graph with every edge pointing into `nodes` removed, i.e. the graph under do(`nodes`).
    pub fn upper_bar_variables(&self, nodes: &OrderedSet<NodeIndex>) -> ADMG<T> {
        let g = self.graph.filter_map(
            |_, node| Some(node.clone()),
            |index, _| match self.graph.edge_endpoints(index) {
                Some((_, n2)) if !nodes.contains(&n2) => Some(()),
                _ => None,
            },
        );

        ADMG {
            graph: g,
            bidirected_edges: self.bidirected_edges.clone(),
        }
    }

    pub fn induced_subgraph(&self, nodes: &OrderedSet<NodeIndex>) -> ADMG<T> {
        let g = self.graph.filter_map(
            |index, node| nodes.contains(&index).then(|| node.clone()),
            |index, _| match self.graph.edge_endpoints(index) {
                Some((n1, n2)) if nodes.contains(&n1) && nodes.contains(&n2) => Some(()),
                _ => None,
            },
        );

        ADMG {
            graph: g,
            bidirected_edges: self.bidirected_edges.clone(),
        }
    }

    /// Returns the ancestors of a set of nodes.
    /// The nodes you are calculating the nodes from are included in the output,
    /// to follow causal inference literature meaning.
    pub fn ancestors(&self, nodes: &OrderedSet<NodeIndex>) -> OrderedSet<NodeIndex> {
        let mut ancestors = nodes.clone();
        let mut pending_nodes: OrderedSet<NodeIndex> = nodes.clone();

        while let Some(node_index) = setutils::pop(&mut pending_nodes) {
            for node in self
                .graph
                .neighbors_directed(node_index, Direction::Incoming)
            {
                if ancestors.insert(node) {
                    pending_nodes.insert(node);
                }
            }
        }

        ancestors
    }
}

impl<T: Variable + Display> ADMG<T> {
    /// Graphviz description of the graph, bidirected edges drawn dashed.
    pub fn to_dot(&self, name: &str) -> String {
        let mut out = format!("digraph {} {{\n", name);
        for node in self.nodes() {
            out.push_str(&format!("    \"{}\";\n", node));
        }
        for (source, target) in self.directed_edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", source, target));
        }
        for (node1, node2) in self.bidirected_edges() {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\" [dir=both, style=dashed];\n",
                node1, node2
            ));
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_induced_subgraph() {
        let mut causal_graph = ADMG::<&str>::new();
        let t = causal_graph.add_node("T");
        let y = causal_graph.add_node("Y");
        causal_graph.add_edge(t, y, ());

        let mut filtered = OrderedSet::new();
        filtered.insert(y);

        let mut result = OrderedSet::new();
        result.insert(y);

        let subgraph = causal_graph.induced_subgraph(&filtered);
        assert_eq!(subgraph.c_components(&[t, y]), vec![result]);
        assert_eq!(subgraph.edge_count(), 0);
    }

    #[test]
    fn test_c_components() {
        let mut causal_graph = ADMG::<&str>::new();
        let a = causal_graph.add_node("A");
        let b = causal_graph.add_node("B");
        let c = causal_graph.add_node("C");

        let c_components = causal_graph.c_components(&[a, b, c]);

        let a_set: OrderedSet<NodeIndex> = [a].iter().copied().collect();
        let b_set: OrderedSet<NodeIndex> = [b].iter().copied().collect();
        let c_set: OrderedSet<NodeIndex> = [c].iter().copied().collect();

        assert_eq!(c_components, vec![a_set, b_set, c_set]);
    }

    #[test]
    fn test_c_components_follow_bidirected_edges() {
        let mut causal_graph = ADMG::<&str>::new();
        let a = causal_graph.add_node("A");
        let b = causal_graph.add_node("B");
        let c = causal_graph.add_node("C");
        causal_graph.add_edge(a, c, ());
        causal_graph.add_bidirected_edge("A", "B").unwrap();

        let ab: OrderedSet<NodeIndex> = [a, b].iter().copied().collect();
        let c_set: OrderedSet<NodeIndex> = [c].iter().copied().collect();

        assert_eq!(causal_graph.c_components(&[a, b, c]), vec![ab, c_set]);
    }

    #[test]
    fn test_self_bidirected_edge_rejected() {
        let mut causal_graph = ADMG::<&str>::new();
        causal_graph.add_node("A");
        assert!(matches!(
            causal_graph.add_bidirected_edge("A", "A"),
            Err(CausalError::SelfBidirected)
        ));
    }

    #[test]
    fn test_ancestors() {
        let mut causal_graph = ADMG::<&str>::new();
        let t = causal_graph.add_node("T");
        let y = causal_graph.add_node("Y");
        causal_graph.add_edge(t, y, ());

        let mut outcomes = OrderedSet::new();
        outcomes.insert(y);

        let mut result = OrderedSet::new();
        result.insert(t);
        result.insert(y);

        assert_eq!(causal_graph.ancestors(&outcomes), result);

        let v0 = causal_graph.add_node("V0");
        let v1 = causal_graph.add_node("V1");
        let x = causal_graph.add_node("X");
        causal_graph.add_edge(v0, t, ());
        causal_graph.add_edge(v1, t, ());
        causal_graph.add_edge(x, v0, ());
        causal_graph.add_edge(x, v1, ());

        result.insert(v0);
        result.insert(v1);
        result.insert(x);

        assert_eq!(causal_graph.ancestors(&outcomes), result);
    }

    #[test]
    fn test_parents_and_lookup() {
        let mut causal_graph = ADMG::<&str>::new();
        let x = causal_graph.add_node("X");
        let t = causal_graph.add_node("T");
        let y = causal_graph.add_node("Y");
        causal_graph.add_edge(x, t, ());
        causal_graph.add_edge(t, y, ());
        causal_graph.add_edge(x, y, ());

        assert_eq!(causal_graph.node_index(&"T"), Some(t));
        assert!(!causal_graph.contains(&"Z"));
        assert_eq!(causal_graph.parents(t), [x].iter().copied().collect());
        assert_eq!(causal_graph.parents(y), [x, t].iter().copied().collect());
        assert_eq!(
            causal_graph.directed_edges(),
            vec![(&"X", &"T"), (&"T", &"Y"), (&"X", &"Y")]
        );
    }

    #[test]
    fn test_to_dot() {
        let mut causal_graph = ADMG::<&str>::new();
        let t = causal_graph.add_node("T");
        let y = causal_graph.add_node("Y");
        causal_graph.add_edge(t, y, ());
        causal_graph.add_bidirected_edge("T", "Y").unwrap();

        assert_eq!(
            causal_graph.to_dot("G"),
            concat!(
                "digraph G {\n",
                "    \"T\";\n",
                "    \"Y\";\n",
                "    \"T\" -> \"Y\";\n",
                "    \"T\" -> \"Y\" [dir=both, style=dashed];\n",
                "}\n",
            )
        );
    }
}
