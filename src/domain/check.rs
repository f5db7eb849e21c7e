//! Structural validation of a scanned graph
//!
//! [`validate`] is pure: it never touches the filesystem and produces the
//! same [`CheckReport`] for the same graph. Findings are data, not errors.

use std::collections::{BTreeMap, HashSet};

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use super::diagnostic::Diagnostic;
use super::graph::{Edge, Graph};

/// Everything wrong with a graph, recomputed on every run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub scan_errors: Vec<Diagnostic>,
    pub undefined_edges: Vec<Edge>,

    /// Each cycle starts at its smallest id and repeats it at the end
    pub cycles: Vec<Vec<String>>,

    pub isolated: Vec<String>,
}

/// The single finding a caller should act on first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Clean,
    ScanErrors,
    UndefinedEdges,
    Cycles,
    /// Isolated nodes and/or a snapshot that no longer matches the sources
    Inconsistent { isolated: bool, drift: bool },
}

impl CheckReport {
    /// True when the graph itself has no findings (drift is not considered)
    pub fn is_clean(&self) -> bool {
        self.status(false) == CheckStatus::Clean
    }

    /// Prioritizes findings: scan errors, undefined edges, cycles, then
    /// isolation and drift together.
    pub fn status(&self, drift: bool) -> CheckStatus {
        if !self.scan_errors.is_empty() {
            CheckStatus::ScanErrors
        } else if !self.undefined_edges.is_empty() {
            CheckStatus::UndefinedEdges
        } else if !self.cycles.is_empty() {
            CheckStatus::Cycles
        } else if !self.isolated.is_empty() || drift {
            CheckStatus::Inconsistent {
                isolated: !self.isolated.is_empty(),
                drift,
            }
        } else {
            CheckStatus::Clean
        }
    }
}

/// Validates `graph`, carrying the scanner's diagnostics into the report
pub fn validate(graph: &Graph, scan_errors: Vec<Diagnostic>) -> CheckReport {
    CheckReport {
        scan_errors,
        undefined_edges: undefined_edges(graph),
        cycles: find_cycles(graph),
        isolated: isolated_nodes(graph),
    }
}

/// Edges whose source or target has no node, in edge order
pub fn undefined_edges(graph: &Graph) -> Vec<Edge> {
    graph
        .edges
        .iter()
        .filter(|edge| !graph.contains(&edge.from) || !graph.contains(&edge.to))
        .cloned()
        .collect()
}

/// Nodes with no incoming or outgoing edge, sorted
pub fn isolated_nodes(graph: &Graph) -> Vec<String> {
    let mut degree: BTreeMap<&str, usize> =
        graph.nodes.keys().map(|id| (id.as_str(), 0)).collect();

    for edge in &graph.edges {
        if let Some(d) = degree.get_mut(edge.from.as_str()) {
            *d += 1;
        }
        if let Some(d) = degree.get_mut(edge.to.as_str()) {
            *d += 1;
        }
    }

    degree
        .into_iter()
        .filter(|(_, d)| *d == 0)
        .map(|(id, _)| id.to_string())
        .collect()
}

/// Every distinct cycle reachable from a defined node, in discovery order
pub fn find_cycles(graph: &Graph) -> Vec<Vec<String>> {
    let mut search = CycleSearch::new(graph.adjacency());
    for id in graph.nodes.keys() {
        if !search.visited.contains(id.as_str()) {
            search.visit(id.as_str());
        }
    }
    search.cycles
}

struct CycleSearch<'g> {
    adjacency: DiGraphMap<&'g str, ()>,
    visited: HashSet<&'g str>,
    on_stack: HashSet<&'g str>,
    stack: Vec<&'g str>,
    seen: HashSet<Vec<String>>,
    cycles: Vec<Vec<String>>,
}

impl<'g> CycleSearch<'g> {
    fn new(adjacency: DiGraphMap<&'g str, ()>) -> Self {
        Self {
            adjacency,
            visited: HashSet::new(),
            on_stack: HashSet::new(),
            stack: Vec::new(),
            seen: HashSet::new(),
            cycles: Vec::new(),
        }
    }

    fn visit(&mut self, node: &'g str) {
        self.visited.insert(node);
        self.on_stack.insert(node);
        self.stack.push(node);

        let next: Vec<&'g str> = self
            .adjacency
            .neighbors_directed(node, Direction::Outgoing)
            .collect();

        for target in next {
            if self.on_stack.contains(target) {
                if let Some(start) = self.stack.iter().rposition(|n| *n == target) {
                    let mut cycle: Vec<String> =
                        self.stack[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(target.to_string());
                    self.record(cycle);
                }
            } else if !self.visited.contains(target) {
                self.visit(target);
            }
        }

        self.stack.pop();
        self.on_stack.remove(node);
    }

    fn record(&mut self, cycle: Vec<String>) {
        let normalized = normalize_cycle(&cycle);
        if self.seen.insert(normalized.clone()) {
            self.cycles.push(normalized);
        }
    }
}

/// Rotates a closed cycle `[a, b, ..., a]` to start at its smallest member
pub fn normalize_cycle(cycle: &[String]) -> Vec<String> {
    if cycle.len() < 2 {
        return cycle.to_vec();
    }

    let ring = &cycle[..cycle.len() - 1];
    let start = ring
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut normalized: Vec<String> = ring[start..].iter().chain(&ring[..start]).cloned().collect();
    normalized.push(normalized[0].clone());
    normalized
}
