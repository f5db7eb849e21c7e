//! `todo-graph deps`: edits `@deps` lines in the sources

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Subcommand};

use super::output::Output;
use super::report::report_structural_failure;
use super::workspace::Workspace;
use crate::edit::{detach_dependency, set_dependencies, Detach};

#[derive(Subcommand)]
pub enum DepsCommands {
    /// Replace the parents of a TODO
    Set {
        /// TODO to update
        #[arg(long)]
        id: String,

        /// Parent ids, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        depends_on: Vec<String>,
    },

    /// Remove one parent, or every parent, from a TODO
    #[command(group(ArgGroup::new("which").required(true).args(["target", "all"])))]
    Detach {
        /// TODO to update
        #[arg(long)]
        id: String,

        /// Parent to remove
        #[arg(long)]
        target: Option<String>,

        /// Remove every parent
        #[arg(long)]
        all: bool,
    },
}

pub fn run(cmd: DepsCommands, workspace: &Workspace, output: &Output) -> Result<ExitCode> {
    let (graph, report) = workspace.scan_and_validate(output)?;
    if let Some(code) = report_structural_failure(output, "deps", &graph, &report) {
        return Ok(code);
    }

    let (id, message) = match cmd {
        DepsCommands::Set { id, depends_on } => {
            let parents: Vec<String> = depends_on
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            output.verbose_ctx("deps", &format!("Setting parents of {}: {:?}", id, parents));
            set_dependencies(workspace.root(), &graph, &id, &parents, &workspace.options)
                .with_context(|| format!("Failed to update @deps for {}", id))?;
            let message = format!("updated @deps for {}", id);
            (id, message)
        }
        DepsCommands::Detach { id, target, all } => {
            let detach = match (&target, all) {
                (_, true) => Detach::All,
                (Some(parent), false) => Detach::Parent(parent),
                (None, false) => anyhow::bail!("either --target or --all is required"),
            };
            output.verbose_ctx("deps", &format!("Detaching {:?} from {}", detach, id));
            detach_dependency(workspace.root(), &graph, &id, detach, &workspace.options)
                .with_context(|| format!("Failed to detach parents from {}", id))?;
            let message = match target {
                Some(parent) if !all => format!("removed parent {} from {}", parent, id),
                _ => format!("removed all parents from {}", id),
            };
            (id, message)
        }
    };

    // Keep the snapshot in step with the edited sources
    let updated = workspace.scan(output)?;
    let written = workspace.write_snapshot(None, &updated.graph)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "success": true,
            "id": id,
            "parents": updated.graph.parents_of(&id),
            "snapshot": written.display().to_string(),
        }));
    } else {
        output.success(&message);
        output.info("snapshot", written.display());
    }

    Ok(ExitCode::SUCCESS)
}
