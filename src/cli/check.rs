//! `todo-graph check`

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use super::output::Output;
use super::report::{report_failure, report_structural_failure};
use super::workspace::Workspace;
use crate::domain::graphs_equal;
use crate::storage::write_errors_json;

/// Same code as drift: the snapshot does not describe the sources
const SNAPSHOT_UNREADABLE: u8 = 3;

/// Validates the sources and compares them with the snapshot
pub fn run(workspace: &Workspace, output: &Output, errors_json: Option<&Path>) -> Result<ExitCode> {
    let (graph, report) = workspace.scan_and_validate(output)?;

    if let Some(path) = errors_json {
        let written = write_errors_json(workspace.root(), Some(path), &report)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        output.verbose_ctx("check", &format!("Wrote error report to {}", written.display()));
    }

    // The snapshot is only read once nothing outranks isolation and drift
    if let Some(code) = report_structural_failure(output, "check", &graph, &report) {
        return Ok(code);
    }

    let snapshot = match workspace.read_snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let _ = report_failure(output, "check", &graph, &report, false);
            output.error(&format!("{:#}", e));
            return Ok(ExitCode::from(SNAPSHOT_UNREADABLE));
        }
    };
    let drift = !graphs_equal(&graph, &snapshot);
    output.verbose_ctx("check", &format!("Snapshot drift: {}", drift));
    if let Some(code) = report_failure(output, "check", &graph, &report, drift) {
        return Ok(code);
    }

    let roots = graph.non_dependant_nodes().len();
    if output.is_json() {
        output.data(&serde_json::json!({
            "success": true,
            "roots": roots,
            "nodes": graph.nodes.len(),
            "edges": graph.edges.len(),
        }));
    } else {
        output.success("Check complete");
        output.info("root TODOs", roots);
        output.info("total TODOs", graph.nodes.len());
    }

    Ok(ExitCode::SUCCESS)
}
