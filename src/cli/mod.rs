//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose | Writes |
//! |---------|---------|--------|
//! | `generate` | Scan, validate, write the snapshot | snapshot |
//! | `check` | Validate and detect snapshot drift | optional JSON report |
//! | `graph` | Stream the graph as JSON or Mermaid | nothing |
//! | `deps set`, `deps detach` | Rewrite `@deps` lines | sources, snapshot |
//! | `fix` | Insert placeholder ids | sources |
//!
//! ## Exit Codes
//!
//! Findings are reported by priority: scan errors (3), undefined edges (1),
//! cycles (2), isolated TODOs or snapshot drift (3). Anything else that
//! fails exits with 1.
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod check;
mod deps;
mod fix;
mod generate;
mod graph;
mod output;
mod report;
mod workspace;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use report::exit_code;
