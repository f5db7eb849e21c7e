//! JSON forms of the graph and of check reports
//!
//! - Graph: `{ "version": 1, "nodes": { id: node }, "edges": [edge] }`,
//!   the alternate snapshot form and readable back.
//! - Payload: `{ "graph": ..., "report"?: ..., "nonDependantNodes"?: [...] }`,
//!   streamed to tools that consume the graph.
//! - Report: the [`CheckReport`] alone, exported for CI.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::snapshot::{SnapshotError, ERRORS_FILE, SNAPSHOT_JSON_FILE, SNAPSHOT_VERSION};
use super::{resolve_output, write_atomic};
use crate::domain::{CheckReport, Edge, Graph, Node};

/// Serialized shape of a [`Graph`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub version: u32,
    pub nodes: BTreeMap<String, Node>,
    pub edges: Vec<Edge>,
}

impl From<&Graph> for GraphDocument {
    fn from(graph: &Graph) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            nodes: graph.nodes.clone(),
            edges: graph.edges.iter().cloned().collect(),
        }
    }
}

impl From<GraphDocument> for Graph {
    fn from(doc: GraphDocument) -> Self {
        let mut graph = Graph::new();
        for (id, mut node) in doc.nodes {
            node.id = id;
            graph.insert_node(node);
        }
        for edge in doc.edges {
            graph.insert_edge(edge);
        }
        graph
    }
}

/// Graph plus optional findings, as streamed by `todo-graph graph`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload<'a> {
    pub graph: GraphDocument,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<&'a CheckReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_dependant_nodes: Option<Vec<&'a Node>>,
}

impl<'a> Payload<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self {
            graph: GraphDocument::from(graph),
            report: None,
            non_dependant_nodes: None,
        }
    }

    pub fn with_report(mut self, report: &'a CheckReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_non_dependants(mut self, graph: &'a Graph) -> Self {
        self.non_dependant_nodes = Some(graph.non_dependant_nodes());
        self
    }
}

pub fn render_graph_json(graph: &Graph) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&GraphDocument::from(graph))
}

pub fn parse_graph_json(text: &str) -> Result<Graph, SnapshotError> {
    let doc: GraphDocument = serde_json::from_str(text)?;
    if doc.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(doc.version.to_string()));
    }
    Ok(doc.into())
}

/// Pretty-printed payload; `report` and the in-degree-zero node list are
/// included only when asked for
pub fn render_payload_json(
    graph: &Graph,
    report: Option<&CheckReport>,
    include_non_dependants: bool,
) -> serde_json::Result<String> {
    let mut payload = Payload::new(graph);
    if let Some(report) = report {
        payload = payload.with_report(report);
    }
    if include_non_dependants {
        payload = payload.with_non_dependants(graph);
    }
    serde_json::to_string_pretty(&payload)
}

pub fn render_report_json(report: &CheckReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Writes the JSON graph to `output` or `root/.todo-graph.json`
pub fn write_graph_json(root: &Path, output: Option<&Path>, graph: &Graph) -> Result<PathBuf, SnapshotError> {
    let path = resolve_output(root, output, SNAPSHOT_JSON_FILE);
    let mut text = render_graph_json(graph)?;
    text.push('\n');
    write_atomic(&path, text.as_bytes()).map_err(|source| SnapshotError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "wrote JSON snapshot");
    Ok(path)
}

/// Writes the report to `output` or `root/todo-graph.errors.json`
pub fn write_errors_json(root: &Path, output: Option<&Path>, report: &CheckReport) -> Result<PathBuf, SnapshotError> {
    let path = resolve_output(root, output, ERRORS_FILE);
    let mut text = render_report_json(report)?;
    text.push('\n');
    write_atomic(&path, text.as_bytes()).map_err(|source| SnapshotError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "wrote error report");
    Ok(path)
}
