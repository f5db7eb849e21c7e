//! Main CLI application structure

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::workspace::Workspace;
use super::{check, deps, fix, generate, graph};

#[derive(Parser)]
#[command(name = "todo-graph")]
#[command(author, version, about = "Dependency graphs from TODO comments")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory to scan (defaults to the nearest configured ancestor)
    #[arg(long, short = 'C', global = true, env = "TODO_GRAPH_DIR")]
    pub dir: Option<PathBuf>,

    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Keywords that open a node, comma-separated
    #[arg(long, global = true, value_delimiter = ',')]
    pub keywords: Option<Vec<String>>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan, validate and write the snapshot
    Generate {
        /// Snapshot path, relative to the scanned directory
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Write the JSON form
        #[arg(long)]
        json: bool,

        /// Write even when validation fails
        #[arg(long)]
        allow_errors: bool,
    },

    /// Validate the sources and compare them with the snapshot
    Check {
        /// Also write the report as JSON
        #[arg(long, value_name = "PATH")]
        errors_json: Option<PathBuf>,
    },

    /// Print the graph as JSON (or Mermaid) without writing files
    Graph {
        /// Print even when validation fails, with the report included
        #[arg(long)]
        allow_errors: bool,

        /// Include TODOs nothing depends on
        #[arg(long)]
        non_dependants: bool,

        /// Print a Mermaid flowchart instead of JSON
        #[arg(long)]
        mermaid: bool,
    },

    /// Edit dependencies in the sources
    #[command(subcommand)]
    Deps(deps::DepsCommands),

    /// Insert placeholder ids where one is missing
    Fix,
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let keywords: Option<Vec<String>> = cli
        .keywords
        .map(|list| list.into_iter().map(|k| k.trim().to_string()).filter(|k| !k.is_empty()).collect());
    let workspace = Workspace::open(cli.dir.as_deref(), keywords)?;

    let format = cli
        .format
        .unwrap_or_else(|| workspace.config.global.default_format.into());
    let output = Output::new(format, cli.verbose);
    output.verbose(&format!("Using root {}", workspace.root().display()));

    match cli.command {
        Commands::Generate {
            output: target,
            json,
            allow_errors,
        } => generate::run(&workspace, &output, target.as_deref(), json, allow_errors),
        Commands::Check { errors_json } => check::run(&workspace, &output, errors_json.as_deref()),
        Commands::Graph {
            allow_errors,
            non_dependants,
            mermaid,
        } => graph::run(&workspace, &output, allow_errors, non_dependants, mermaid),
        Commands::Deps(cmd) => deps::run(cmd, &workspace, &output),
        Commands::Fix => fix::run(&workspace, &output),
    }
}
