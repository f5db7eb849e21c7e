//! `todo-graph fix`

use std::process::ExitCode;

use anyhow::{Context, Result};

use super::output::Output;
use super::workspace::Workspace;
use crate::edit::insert_missing_id_placeholders;

/// Adds placeholder ids, then lists what is still wrong
pub fn run(workspace: &Workspace, output: &Output) -> Result<ExitCode> {
    let report = insert_missing_id_placeholders(workspace.root(), &workspace.options)
        .context("Failed to insert placeholder ids")?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": true,
            "added": report.added,
            "others": report.others,
        }));
        return Ok(ExitCode::SUCCESS);
    }

    if report.added.is_empty() {
        output.success("no missing ids to add");
    } else {
        output.success(&format!("placeholders added: {}", report.added.len()));
        for node in &report.added {
            output.info(&node.id, node.location());
        }
    }

    let skipped = report.missing.len().saturating_sub(report.added.len());
    if skipped > 0 {
        output.warn(&format!("{} missing ids could not be filled in", skipped));
    }
    if !report.others.is_empty() {
        output.warn("other scan errors remain; run `todo-graph check` after fixing ids");
        for diagnostic in &report.others {
            output.finding(&diagnostic.to_string());
        }
    }

    Ok(ExitCode::SUCCESS)
}
