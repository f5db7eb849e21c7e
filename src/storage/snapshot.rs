//! Snapshot file format
//!
//! A small YAML-compatible text format with a fixed shape:
//!
//! ```text
//! version: 1
//!
//! nodes:
//!   cache-layer:
//!     file: "src/cache.go"
//!     line: 12
//!
//! edges:
//!   - from: "db"
//!     to: "cache-layer"
//!     type: "blocks"
//! ```
//!
//! Nodes are written in id order and edges in canonical order, so the same
//! graph always produces the same bytes. Strings use Go-style quoting, which
//! is also valid YAML double-quoted syntax. The reader is a line reader for
//! exactly this shape, not a YAML parser.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::{json, resolve_output, write_atomic};
use crate::domain::{Edge, Graph, Node};

pub const SNAPSHOT_FILE: &str = ".todo-graph";
pub const SNAPSHOT_JSON_FILE: &str = ".todo-graph.json";
pub const ERRORS_FILE: &str = "todo-graph.errors.json";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: invalid line number \"{value}\"")]
    InvalidLine { line: usize, value: String },

    #[error("unsupported snapshot version \"{0}\"")]
    UnsupportedVersion(String),

    #[error("Invalid JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk representation, chosen by file extension when reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    #[default]
    Text,
    Json,
}

impl SnapshotFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SnapshotFormat::Json,
            _ => SnapshotFormat::Text,
        }
    }

    pub fn default_file(self) -> &'static str {
        match self {
            SnapshotFormat::Text => SNAPSHOT_FILE,
            SnapshotFormat::Json => SNAPSHOT_JSON_FILE,
        }
    }
}

/// Renders `graph` in the snapshot format
pub fn render_snapshot(graph: &Graph) -> String {
    let mut out = format!("version: {}\n\n", SNAPSHOT_VERSION);

    if graph.nodes.is_empty() {
        out.push_str("nodes: {}\n\n");
    } else {
        out.push_str("nodes:\n");
        for (id, node) in &graph.nodes {
            let _ = writeln!(out, "  {}:", id);
            let _ = writeln!(out, "    file: {}", quote(&node.file));
            // Each node block ends with a blank line
            let _ = writeln!(out, "    line: {}\n", node.line);
        }
    }

    out.push_str("edges:\n");
    if graph.edges.is_empty() {
        out.push_str("  []\n");
    } else {
        for edge in &graph.edges {
            let _ = writeln!(out, "  - from: {}", quote(&edge.from));
            let _ = writeln!(out, "    to: {}", quote(&edge.to));
            let _ = writeln!(out, "    type: {}", quote(&edge.kind));
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Nodes,
    Edges,
}

#[derive(Debug, Default)]
struct EdgeDraft {
    from: Option<String>,
    to: Option<String>,
    kind: Option<String>,
}

impl EdgeDraft {
    /// Edges missing an endpoint are dropped
    fn finish(self, graph: &mut Graph) {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            graph.insert_edge(Edge::new(from, to, self.kind.unwrap_or_default()));
        }
    }
}

/// Parses the snapshot format
pub fn parse_snapshot(text: &str) -> Result<Graph, SnapshotError> {
    let mut graph = Graph::new();
    let mut section = Section::Preamble;
    let mut current_id: Option<String> = None;
    let mut edge: Option<EdgeDraft> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Section headers are never indented, so ids like `nodes` stay ids
        let top_level = !raw.starts_with(char::is_whitespace);

        if let Some(version) = line.strip_prefix("version:").filter(|_| top_level) {
            let version = version.trim();
            if version.parse::<u32>().ok() != Some(SNAPSHOT_VERSION) {
                return Err(SnapshotError::UnsupportedVersion(version.to_string()));
            }
            continue;
        }
        if top_level && (line == "nodes:" || line == "nodes: {}") {
            section = Section::Nodes;
            current_id = None;
            continue;
        }
        if top_level && (line == "edges:" || line == "edges: []") {
            if let Some(draft) = edge.take() {
                draft.finish(&mut graph);
            }
            section = Section::Edges;
            continue;
        }

        match section {
            Section::Preamble => {}
            Section::Nodes => {
                if let Some(id) = line.strip_suffix(':').filter(|id| !id.contains(char::is_whitespace)) {
                    graph.insert_node(Node::new(id, "", 0));
                    current_id = Some(id.to_string());
                    continue;
                }
                let Some(node) = current_id.as_ref().and_then(|id| graph.nodes.get_mut(id)) else {
                    continue;
                };
                if let Some(value) = field(line, "file") {
                    node.file = unquote(value).unwrap_or_else(|| value.to_string());
                } else if let Some(value) = field(line, "line") {
                    node.line = value.parse().map_err(|_| SnapshotError::InvalidLine {
                        line: idx + 1,
                        value: value.to_string(),
                    })?;
                }
            }
            Section::Edges => {
                if line == "[]" {
                    continue;
                }
                let mut line = line;
                if let Some(rest) = line.strip_prefix('-') {
                    if let Some(draft) = edge.take() {
                        draft.finish(&mut graph);
                    }
                    edge = Some(EdgeDraft::default());
                    line = rest.trim_start();
                }
                let Some(draft) = edge.as_mut() else {
                    continue;
                };
                if let Some(value) = field(line, "from") {
                    draft.from = Some(unquote(value).unwrap_or_else(|| value.to_string()));
                } else if let Some(value) = field(line, "to") {
                    draft.to = Some(unquote(value).unwrap_or_else(|| value.to_string()));
                } else if let Some(value) = field(line, "type") {
                    draft.kind = Some(unquote(value).unwrap_or_else(|| value.to_string()));
                }
            }
        }
    }

    if let Some(draft) = edge {
        draft.finish(&mut graph);
    }
    Ok(graph)
}

/// Value of `key: value`
fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)?.strip_prefix(':').map(str::trim)
}

/// Writes the text snapshot to `output` (relative to `root`) or to
/// `root/.todo-graph`, returning the path written
pub fn write_snapshot(root: &Path, output: Option<&Path>, graph: &Graph) -> Result<PathBuf, SnapshotError> {
    let path = resolve_output(root, output, SNAPSHOT_FILE);
    write_atomic(&path, render_snapshot(graph).as_bytes()).map_err(|source| SnapshotError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), nodes = graph.nodes.len(), "wrote snapshot");
    Ok(path)
}

/// Reads a snapshot, picking the parser from the file extension
pub fn read_snapshot(root: &Path, path: Option<&Path>) -> Result<Graph, SnapshotError> {
    let path = resolve_output(root, path, SNAPSHOT_FILE);
    let text = fs::read_to_string(&path).map_err(|source| SnapshotError::Read {
        path: path.clone(),
        source,
    })?;

    match SnapshotFormat::for_path(&path) {
        SnapshotFormat::Text => parse_snapshot(&text),
        SnapshotFormat::Json => json::parse_graph_json(&text),
    }
}

/// Double-quotes `s` the way Go's `strconv.Quote` does
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0b}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Inverse of [`quote`]; `None` if `s` is not a valid quoted string
pub fn unquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\n' => return None,
            '\\' => {
                let escaped = match chars.next()? {
                    'a' => '\u{07}',
                    'b' => '\u{08}',
                    'f' => '\u{0c}',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'v' => '\u{0b}',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    'x' => hex_char(&mut chars, 2)?,
                    'u' => hex_char(&mut chars, 4)?,
                    'U' => hex_char(&mut chars, 8)?,
                    d @ '0'..='7' => {
                        let mut value = d.to_digit(8)?;
                        for _ in 0..2 {
                            value = value * 8 + chars.next()?.to_digit(8)?;
                        }
                        char::from_u32(value)?
                    }
                    _ => return None,
                };
                out.push(escaped);
            }
            c => out.push(c),
        }
    }
    Some(out)
}

fn hex_char(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let mut value = 0u32;
    for _ in 0..digits {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn sample() -> Graph {
        let mut graph = Graph::new();
        graph.insert_node(Node::new("cache", "src/cache.go", 12));
        graph.insert_node(Node::new("db", "db/schema.sql", 3));
        graph.insert_edge(Edge::blocks("db", "cache"));
        graph
    }

    #[test]
    fn renders_exact_layout() {
        let expected = "version: 1\n\nnodes:\n  cache:\n    file: \"src/cache.go\"\n    line: 12\n\n  db:\n    file: \"db/schema.sql\"\n    line: 3\n\nedges:\n  - from: \"db\"\n    to: \"cache\"\n    type: \"blocks\"\n";
        assert_eq!(render_snapshot(&sample()), expected);
    }

    #[test]
    fn renders_empty_graph() {
        assert_eq!(render_snapshot(&Graph::new()), "version: 1\n\nnodes: {}\n\nedges:\n  []\n");
        assert_eq!(parse_snapshot(&render_snapshot(&Graph::new())).unwrap(), Graph::new());
    }

    #[test]
    fn round_trips_sample() {
        assert_eq!(parse_snapshot(&render_snapshot(&sample())).unwrap(), sample());
    }

    #[test]
    fn snapshot_is_valid_yaml() {
        let value: serde_yaml::Value = serde_yaml::from_str(&render_snapshot(&sample())).unwrap();
        assert_eq!(value["version"].as_u64(), Some(1));
        assert_eq!(value["nodes"]["cache"]["line"].as_u64(), Some(12));
        assert_eq!(value["edges"][0]["from"].as_str(), Some("db"));
    }

    #[test]
    fn reader_ignores_comments_and_drops_partial_edges() {
        let text = "# generated\nversion: 1\nnodes:\n  a:\n    file: a.go\n    line: 4\nedges:\n  - from: \"a\"\n  - from: \"x\"\n    to: \"a\"\n";
        let graph = parse_snapshot(text).unwrap();
        assert_eq!(graph.node("a"), Some(&Node::new("a", "a.go", 4)));
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges.iter().next().unwrap().kind, "");
    }

    #[test]
    fn ids_named_like_sections() {
        let mut graph = Graph::new();
        graph.insert_node(Node::new("nodes", "a", 1));
        graph.insert_node(Node::new("edges", "b", 2));
        graph.insert_node(Node::new("version", "c", 3));
        assert_eq!(parse_snapshot(&render_snapshot(&graph)).unwrap(), graph);
    }

    #[test]
    fn invalid_line_number_is_an_error() {
        let err = parse_snapshot("nodes:\n  a:\n    file: \"a\"\n    line: twelve\n").unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidLine { line: 4, .. }));
        assert!(err.to_string().contains("invalid line number"));
    }

    #[test]
    fn unknown_version_is_an_error() {
        assert!(matches!(
            parse_snapshot("version: 2\n"),
            Err(SnapshotError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("a\"b\\c\nd\te\u{1}"), "\"a\\\"b\\\\c\\nd\\te\\x01\"");
        assert_eq!(unquote("\"a\\\"b\\\\c\\nd\\te\\x01\"").unwrap(), "a\"b\\c\nd\te\u{1}");
        assert_eq!(unquote("\"\\u00e9\\101\"").unwrap(), "éA");
        assert_eq!(unquote("bare"), None);
        assert_eq!(unquote("\"bad\\q\""), None);
    }

    #[test]
    fn write_and_read_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = write_snapshot(dir.path(), None, &sample()).unwrap();
        assert_eq!(path, dir.path().join(SNAPSHOT_FILE));
        assert_eq!(read_snapshot(dir.path(), None).unwrap(), sample());

        let custom = write_snapshot(dir.path(), Some(Path::new("out/graph.yaml")), &sample()).unwrap();
        assert!(custom.ends_with("out/graph.yaml"));
        assert_eq!(read_snapshot(dir.path(), Some(Path::new("out/graph.yaml"))).unwrap(), sample());
    }

    #[test]
    fn missing_snapshot_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(read_snapshot(dir.path(), None), Err(SnapshotError::Read { .. })));
    }

    fn arb_graph() -> impl Strategy<Value = Graph> {
        let node = ("[a-z0-9_-]{1,8}", "[a-zA-Z0-9 ./\"\\\\_-]{0,12}", 1usize..10_000);
        let edge = ("[a-z0-9_-]{1,8}", "[a-z0-9_-]{1,8}", prop_oneof![Just("blocks".to_string()), "[a-z]{1,6}"]);
        (
            prop::collection::vec(node, 0..8),
            prop::collection::vec(edge, 0..8),
        )
            .prop_map(|(nodes, edges)| {
                let mut graph = Graph::new();
                for (id, file, line) in nodes {
                    graph.insert_node(Node::new(id, file, line));
                }
                for (from, to, kind) in edges {
                    graph.insert_edge(Edge::new(from, to, kind));
                }
                graph
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn snapshot_round_trip(graph in arb_graph()) {
            let text = render_snapshot(&graph);
            prop_assert_eq!(parse_snapshot(&text).unwrap(), graph.clone());
            prop_assert_eq!(render_snapshot(&parse_snapshot(&text).unwrap()), text);
        }

        #[test]
        fn quote_round_trip(s in "\\PC*") {
            prop_assert_eq!(unquote(&quote(&s)), Some(s));
        }
    }
}
