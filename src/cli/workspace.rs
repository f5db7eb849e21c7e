//! The scanned tree a command works on

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::output::Output;
use crate::domain::{validate, CheckReport, Graph};
use crate::scanner::{scan, ScanOptions, ScanOutput};
use crate::storage::{read_snapshot, write_graph_json, write_snapshot, Config, SnapshotFormat};

/// Root directory plus its loaded configuration
pub struct Workspace {
    pub config: Config,
    pub options: ScanOptions,
}

impl Workspace {
    /// Opens `dir`, or the nearest configured ancestor of the current
    /// directory when no directory is given
    pub fn open(dir: Option<&Path>, keywords: Option<Vec<String>>) -> Result<Self> {
        let root = match dir {
            Some(dir) => dir.to_path_buf(),
            None => {
                let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
                Config::find_root(&cwd).unwrap_or(cwd)
            }
        };
        if !root.is_dir() {
            anyhow::bail!("{} is not a directory", root.display());
        }

        let mut config = Config::for_root(&root)?;
        if let Some(keywords) = keywords {
            config.override_keywords(keywords)?;
        }
        let options = config.scan_options();

        Ok(Self { config, options })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn scan(&self, output: &Output) -> Result<ScanOutput> {
        output.verbose_ctx("scan", &format!("Scanning {}", self.root().display()));
        let scanned = scan(self.root(), &self.options)
            .with_context(|| format!("Scan failed: {}", self.root().display()))?;
        output.verbose_ctx(
            "scan",
            &format!(
                "Found {} nodes, {} edges, {} diagnostics",
                scanned.graph.nodes.len(),
                scanned.graph.edges.len(),
                scanned.diagnostics.len()
            ),
        );
        Ok(scanned)
    }

    /// Scans and validates in one step
    pub fn scan_and_validate(&self, output: &Output) -> Result<(Graph, CheckReport)> {
        let scanned = self.scan(output)?;
        let report = validate(&scanned.graph, scanned.diagnostics);
        Ok((scanned.graph, report))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.config.snapshot_path()
    }

    pub fn read_snapshot(&self) -> Result<Graph> {
        read_snapshot(self.root(), Some(Path::new(&self.config.project.snapshot))).with_context(|| {
            format!(
                "Failed to read {} (run todo-graph generate)",
                self.snapshot_path().display()
            )
        })
    }

    /// Writes `graph` to `output` (relative to the root), or to the
    /// configured snapshot path. A `.json` target gets the JSON form.
    pub fn write_snapshot(&self, output: Option<&Path>, graph: &Graph) -> Result<PathBuf> {
        let target = output.unwrap_or_else(|| Path::new(&self.config.project.snapshot));
        let written = match SnapshotFormat::for_path(target) {
            SnapshotFormat::Text => write_snapshot(self.root(), Some(target), graph),
            SnapshotFormat::Json => write_graph_json(self.root(), Some(target), graph),
        };
        written.with_context(|| format!("Failed to write {}", target.display()))
    }
}
