//! `todo-graph generate`

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use super::output::Output;
use super::report::report_failure;
use super::workspace::Workspace;
use crate::storage::SnapshotFormat;

/// Scans, validates and writes the snapshot
pub fn run(
    workspace: &Workspace,
    output: &Output,
    target: Option<&Path>,
    json: bool,
    allow_errors: bool,
) -> Result<ExitCode> {
    let (graph, report) = workspace.scan_and_validate(output)?;

    if allow_errors {
        if !report.is_clean() {
            output.verbose_ctx("generate", "Writing despite validation findings");
        }
    } else if let Some(code) = report_failure(output, "generate", &graph, &report, false) {
        return Ok(code);
    }

    let target = match (target, json) {
        (None, true) => Some(Path::new(SnapshotFormat::Json.default_file())),
        (target, _) => target,
    };
    let written = workspace.write_snapshot(target, &graph)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": true,
            "path": written.display().to_string(),
            "nodes": graph.nodes.len(),
            "edges": graph.edges.len(),
            "clean": report.is_clean(),
        }));
    } else {
        output.success("Generate complete");
        output.info("generated", written.display());
        output.info("total TODOs", graph.nodes.len());
        output.info("edges", graph.edges.len());
    }

    Ok(ExitCode::SUCCESS)
}
