//! Structural equality between two graphs, used for drift detection

use super::graph::Graph;

/// True when both graphs hold the same `(id, file, line)` nodes and the
/// same edges. Both collections are kept in canonical order, so order never
/// matters here.
pub fn graphs_equal(a: &Graph, b: &Graph) -> bool {
    if a.nodes.len() != b.nodes.len() || a.edges.len() != b.edges.len() {
        return false;
    }

    let nodes_match = a.nodes.iter().all(|(id, node)| {
        b.nodes
            .get(id)
            .is_some_and(|other| other.file == node.file && other.line == node.line)
    });

    nodes_match && a.edges.iter().eq(b.edges.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Edge, Node};

    fn graph() -> Graph {
        let mut graph = Graph::new();
        graph.insert_node(Node::new("a", "a.go", 1));
        graph.insert_node(Node::new("b", "b.go", 2));
        graph.insert_edge(Edge::blocks("a", "b"));
        graph
    }

    #[test]
    fn identical_graphs_are_equal() {
        assert!(graphs_equal(&graph(), &graph()));
    }

    #[test]
    fn moved_line_is_drift() {
        let mut moved = graph();
        moved.insert_node(Node::new("a", "a.go", 7));
        assert!(!graphs_equal(&graph(), &moved));
    }

    #[test]
    fn edge_type_matters() {
        let mut other = graph();
        other.edges.clear();
        other.insert_edge(Edge::new("a", "b", "relates"));
        assert!(!graphs_equal(&graph(), &other));
    }
}
