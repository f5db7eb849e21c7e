//! Domain models for todo-graph
//!
//! Contains the graph, its validation and comparison without any I/O
//! concerns.

mod check;
mod compare;
mod diagnostic;
mod graph;
mod id;

pub use check::{find_cycles, isolated_nodes, normalize_cycle, undefined_edges, validate, CheckReport, CheckStatus};
pub use compare::graphs_equal;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use graph::{Edge, Graph, Node, BLOCKS};
pub use id::{placeholder_base, unique_id, validate_id, IdError};
