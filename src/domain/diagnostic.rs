//! Non-fatal scan findings

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a diagnostic is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A tagged comment carries metadata but no id, or an empty id
    MissingId,
    InvalidId,
    /// Metadata with no owning tag
    OrphanMetadata,
    MultipleDeps,
    SpaceSeparated,
    UnknownMetadata,
    /// Keyword after a comment opener in the middle of a code line
    MisplacedKeyword,
    /// Second `@id` for one node
    RepeatedId,
    DuplicateId,
}

/// A problem found while scanning, located in the source tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub message: String,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        file: impl Into<String>,
        line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
            kind,
        }
    }

    pub fn is_missing_id(&self) -> bool {
        self.kind == DiagnosticKind::MissingId
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}
