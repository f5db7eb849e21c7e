//! todo-graph - Dependency graphs built from TODO comments
//!
//! Tagged comments (`TODO: [#id]`, `@id`, `@deps a, b`) anywhere in a source
//! tree become nodes and edges. The graph is validated, compared with a
//! committed snapshot and edited back into the sources.

pub mod cli;
pub mod domain;
pub mod edit;
pub mod scanner;
pub mod storage;

pub use domain::{validate, CheckReport, CheckStatus, Diagnostic, DiagnosticKind, Edge, Graph, Node};
pub use scanner::{scan, Grammar, ScanOptions, ScanOutput};
