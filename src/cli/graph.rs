//! `todo-graph graph`: streams the graph to stdout, writes nothing

use std::process::ExitCode;

use anyhow::{Context, Result};

use super::output::Output;
use super::report::report_failure;
use super::workspace::Workspace;
use crate::storage::render_payload_json;

pub fn run(
    workspace: &Workspace,
    output: &Output,
    allow_errors: bool,
    non_dependants: bool,
    mermaid: bool,
) -> Result<ExitCode> {
    let (graph, report) = workspace.scan_and_validate(output)?;

    if !allow_errors {
        if let Some(code) = report_failure(output, "graph", &graph, &report, false) {
            return Ok(code);
        }
    }

    if mermaid {
        print!("{}", graph.to_mermaid());
    } else {
        let include_report = allow_errors.then_some(&report);
        let json = render_payload_json(&graph, include_report, non_dependants)
            .context("Failed to serialize graph")?;
        println!("{}", json);
    }

    Ok(ExitCode::SUCCESS)
}
