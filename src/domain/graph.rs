//! Dependency graph of annotated comments
//!
//! Nodes are keyed by their identifier, edges point from a parent to the
//! node that declared it. Both collections iterate in canonical order, so
//! serializers and validators never sort on their own.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// Edge type produced for `@deps` declarations
pub const BLOCKS: &str = "blocks";

/// A tagged comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,

    /// Path relative to the scan root, `/`-separated
    pub file: String,

    /// 1-based declaring line
    pub line: usize,
}

impl Node {
    pub fn new(id: impl Into<String>, file: impl Into<String>, line: usize) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            line,
        }
    }

    /// `file:line`, as shown in diagnostics
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// A directed dependency, parent first
///
/// Field order doubles as the canonical sort order: `from`, `to`, `type`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind: kind.into(),
        }
    }

    /// `parent` must be done before `child`
    pub fn blocks(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self::new(parent, child, BLOCKS)
    }
}

/// Nodes plus edges. Edges may name ids that have no node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub nodes: BTreeMap<String, Node>,
    pub edges: BTreeSet<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, returning the one it replaced
    pub fn insert_node(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Inserts an edge; duplicates collapse
    pub fn insert_edge(&mut self, edge: Edge) -> bool {
        self.edges.insert(edge)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Directed adjacency over every id mentioned by a node or an edge.
    ///
    /// Nodes are added in id order and edges in canonical order, so
    /// neighbor iteration is deterministic.
    pub fn adjacency(&self) -> DiGraphMap<&str, ()> {
        let mut adjacency = DiGraphMap::new();
        for id in self.nodes.keys() {
            adjacency.add_node(id.as_str());
        }
        for edge in &self.edges {
            adjacency.add_edge(edge.from.as_str(), edge.to.as_str(), ());
        }
        adjacency
    }

    /// Sorted, deduplicated parents declared for `child` through `blocks` edges
    pub fn parents_of(&self, child: &str) -> Vec<String> {
        let parents: BTreeSet<&str> = self
            .edges
            .iter()
            .filter(|edge| edge.to == child && edge.kind == BLOCKS)
            .map(|edge| edge.from.as_str())
            .collect();

        parents.into_iter().map(str::to_string).collect()
    }

    /// Nodes nothing points at (self-loops count as incoming), sorted by id
    pub fn non_dependant_nodes(&self) -> Vec<&Node> {
        let adjacency = self.adjacency();
        self.nodes
            .values()
            .filter(|node| {
                adjacency
                    .neighbors_directed(node.id.as_str(), Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Mermaid flowchart of the edges
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        if self.edges.is_empty() {
            out.push_str("  %% no edges\n");
            return out;
        }
        for edge in &self.edges {
            let _ = writeln!(out, "  {} --> {}", edge.from, edge.to);
        }
        out
    }
}
