//! # Source Editors
//!
//! In-place rewrites of tagged comments:
//!
//! - [`set_dependencies`], [`clear_dependencies`] and [`detach_dependency`]
//!   maintain the `@deps` line of one node.
//! - [`insert_missing_id_placeholders`] gives every id-less tagged comment a
//!   generated id.
//!
//! Edits are planned against the original lines using the scanner's own
//! comment classifier, then applied and written back with one atomic write
//! per file. Validation failures abort before anything is written. The
//! caller re-scans afterwards; the graph passed in is only used to locate
//! nodes.

mod deps;
mod placeholder;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::scanner::ScanError;
use crate::storage::write_atomic;

pub use deps::{clear_dependencies, detach_dependency, set_dependencies, Detach};
pub use placeholder::{insert_missing_id_placeholders, FixReport};

#[derive(Debug, Error)]
pub enum EditError {
    #[error("node \"{0}\" not found")]
    NodeNotFound(String),

    #[error("parent node \"{0}\" not found")]
    ParentNotFound(String),

    #[error("at least one parent is required")]
    EmptyParents,

    #[error("parent \"{parent}\" not found on node \"{child}\"")]
    NotAParent { parent: String, child: String },

    #[error("line {line} is out of range for {file}")]
    LineOutOfRange { file: String, line: usize },

    #[error("{file}:{line} is not a comment line")]
    NotAComment { file: String, line: usize },

    #[error("multiple @deps entries found for \"{id}\" in {file}")]
    MultipleDeps { id: String, file: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8 and cannot be edited")]
    NotUtf8 { path: PathBuf },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// A source file held as lines. Line terminators other than `\n` stay
/// attached to their line, so joining reproduces the file byte for byte.
#[derive(Debug)]
pub(crate) struct SourceFile {
    path: PathBuf,
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Reads `path`. The scanner decodes lossily, but a rewrite must not
    /// replace bytes, so only valid UTF-8 is accepted here.
    pub fn open(path: &Path) -> Result<Self, EditError> {
        let bytes = fs::read(path).map_err(|source| EditError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8(bytes).map_err(|_| EditError::NotUtf8 {
            path: path.to_path_buf(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            lines: content.split('\n').map(str::to_string).collect(),
        })
    }

    pub fn save(&self) -> Result<(), EditError> {
        write_atomic(&self.path, self.lines.join("\n").as_bytes()).map_err(|source| EditError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(file = %self.path.display(), "rewrote source file");
        Ok(())
    }
}

/// Builds a new line that ends like `template` (`\r\n` files stay `\r\n`)
pub(crate) fn line_like(template: &str, text: String) -> String {
    if template.ends_with('\r') {
        text + "\r"
    } else {
        text
    }
}

/// Replaces the `payload` part of `raw`, keeping delimiters around it
pub(crate) fn replace_payload(raw: &str, payload: &str, replacement: &str) -> Option<String> {
    let start = raw.find(payload)?;
    let end = start + payload.len();
    Some(format!("{}{}{}", &raw[..start], replacement, &raw[end..]))
}
