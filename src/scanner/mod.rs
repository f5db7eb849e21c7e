//! # Scanner
//!
//! Walks a source tree and turns tagged comments into a [`Graph`].
//!
//! ## Pipeline
//!
//! 1. Walk the tree depth-first in file-name order, pruning VCS, dependency
//!    and editor folders, symlinks, binary files and the tool's own files.
//! 2. Classify every line with the comment state machine in [`comment`].
//! 3. Interpret comment payloads as metadata tags ([`metadata`]) and group
//!    them into pending nodes, flushed on blank or code lines.
//! 4. Merge per-file results: the first declaration of an id wins.
//!
//! Malformed tags never abort a scan; they become [`Diagnostic`]s. Only I/O
//! failures are errors.

pub mod comment;
pub mod metadata;

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::{placeholder_base, validate_id, Diagnostic, DiagnosticKind, Edge, Graph, IdError, Node};
use comment::{Classifier, Line};
use metadata::{match_keyword, parse_ids, parse_tag, Tag};

pub use metadata::{Grammar, DEFAULT_KEYWORDS, DEPS_TAG, ID_TAG};

/// Directories never descended into
pub const SKIPPED_DIRS: [&str; 7] = [".git", ".hg", ".svn", "node_modules", "vendor", ".idea", ".vscode"];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to look for and what to leave alone
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub grammar: Grammar,

    /// Node-opening keywords, matched case-insensitively
    pub keywords: Vec<String>,

    /// Directory names pruned in addition to [`SKIPPED_DIRS`]
    pub ignore_dirs: Vec<String>,

    /// Root-relative, `/`-separated paths that are never read
    pub skip_files: BTreeSet<String>,

    /// Give keyword comments without an id a path-derived id instead of
    /// reporting them
    pub derive_ids: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            grammar: Grammar::default(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            ignore_dirs: Vec::new(),
            skip_files: BTreeSet::new(),
            derive_ids: false,
        }
    }
}

impl ScanOptions {
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn skip_file(mut self, relative: impl Into<String>) -> Self {
        self.skip_files.insert(relative.into());
        self
    }

    fn skips_dir(&self, name: &str) -> bool {
        SKIPPED_DIRS.contains(&name) || self.ignore_dirs.iter().any(|d| d == name)
    }
}

/// Result of a scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub graph: Graph,

    /// Sorted by file path, then line
    pub diagnostics: Vec<Diagnostic>,
}

/// Nodes, edges and diagnostics found in one file
#[derive(Debug, Clone, Default)]
pub struct FileScan {
    /// In line order
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scans every text file under `root`
pub fn scan(root: &Path, options: &ScanOptions) -> Result<ScanOutput, ScanError> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            let skip = options.skips_dir(&name);
            if skip {
                debug!(dir = %entry.path().display(), "skipping directory");
            }
            !skip
        });

    for entry in walker {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: source.path().unwrap_or(root).to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_path(root, entry.path());
        if options.skip_files.contains(&relative) {
            debug!(file = %relative, "skipping tool file");
            continue;
        }

        let bytes = fs::read(entry.path()).map_err(|source| ScanError::Read {
            path: entry.path().to_path_buf(),
            source,
        })?;
        if bytes.contains(&0) {
            debug!(file = %relative, "skipping binary file");
            continue;
        }

        let text = String::from_utf8_lossy(&bytes);
        debug!(file = %relative, "scanning");
        files.push(scan_source(&relative, &text, options));
    }

    let output = merge(files);
    info!(
        nodes = output.graph.nodes.len(),
        edges = output.graph.edges.len(),
        diagnostics = output.diagnostics.len(),
        "scan finished"
    );
    Ok(output)
}

/// `/`-separated path of `path` below `root`
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Combines per-file results in walk order. A repeated id is reported at
/// its later location and dropped.
fn merge(files: Vec<FileScan>) -> ScanOutput {
    let mut output = ScanOutput::default();

    for file in files {
        output.diagnostics.extend(file.diagnostics);
        for node in file.nodes {
            if let Some(first) = output.graph.node(&node.id) {
                output.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DuplicateId,
                    node.file.clone(),
                    node.line,
                    format!("duplicate id \"{}\" (first defined at {})", node.id, first.location()),
                ));
                continue;
            }
            output.graph.insert_node(node);
        }
        for edge in file.edges {
            output.graph.insert_edge(edge);
        }
    }

    output
        .diagnostics
        .sort_by(|a, b| Path::new(&a.file).cmp(Path::new(&b.file)).then(a.line.cmp(&b.line)));
    output
}

/// Scans the text of one file. `file` is the path reported in nodes and
/// diagnostics.
pub fn scan_source(file: &str, text: &str, options: &ScanOptions) -> FileScan {
    let mut scanner = FileScanner::new(file, options);
    let mut classifier = Classifier::new();

    for (idx, raw) in text.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let line = idx + 1;
        match classifier.classify(raw) {
            Line::Blank => scanner.flush(),
            Line::Code(code) => {
                scanner.flush();
                scanner.check_trailing(code, line);
            }
            Line::Comment(comment) => scanner.comment(comment.payload, line),
        }
    }
    scanner.flush();

    scanner.result
}

/// A node being assembled from consecutive comment lines
#[derive(Debug)]
struct Pending {
    /// Node line once owned, otherwise the first metadata line
    line: usize,
    keyword: Option<String>,
    id: Option<String>,
    id_line: Option<usize>,
    deps: Vec<String>,
    deps_line: Option<usize>,
    has_meta: bool,
    invalid: bool,
}

impl Pending {
    fn new(line: usize, keyword: Option<String>) -> Self {
        Self {
            line,
            keyword,
            id: None,
            id_line: None,
            deps: Vec::new(),
            deps_line: None,
            has_meta: false,
            invalid: false,
        }
    }

    fn label(&self) -> String {
        self.keyword.clone().unwrap_or_else(|| ID_TAG.to_string())
    }
}

struct FileScanner<'a> {
    file: &'a str,
    options: &'a ScanOptions,
    pending: Option<Pending>,
    /// Ids already emitted in this file
    seen: HashMap<String, usize>,
    result: FileScan,
}

impl<'a> FileScanner<'a> {
    fn new(file: &'a str, options: &'a ScanOptions) -> Self {
        Self {
            file,
            options,
            pending: None,
            seen: HashMap::new(),
            result: FileScan::default(),
        }
    }

    fn diagnose(&mut self, kind: DiagnosticKind, line: usize, message: impl Into<String>) {
        self.result
            .diagnostics
            .push(Diagnostic::new(kind, self.file, line, message));
    }

    fn comment(&mut self, payload: &str, line: usize) {
        match parse_tag(payload, self.options.grammar, &self.options.keywords) {
            Tag::Keyword { keyword, inline_id } => {
                self.flush();
                self.pending = Some(Pending::new(line, Some(keyword.to_ascii_uppercase())));
                if let Some(value) = inline_id {
                    self.assign_id(value, line);
                }
            }
            Tag::Id(value) => {
                if self.options.grammar == Grammar::Explicit {
                    self.flush();
                    self.pending = Some(Pending::new(line, None));
                }
                let pending = self.pending.get_or_insert_with(|| Pending::new(line, None));
                pending.has_meta = true;
                if let Some(first) = pending.id_line {
                    let message = format!("{} already declared for this node at line {}", ID_TAG, first);
                    self.diagnose(DiagnosticKind::RepeatedId, line, message);
                } else {
                    self.assign_id(value, line);
                }
            }
            Tag::Deps(raw) => {
                let pending = self.pending.get_or_insert_with(|| Pending::new(line, None));
                pending.has_meta = true;
                if let Some(first) = pending.deps_line {
                    let message = format!(
                        "multiple {} lines for one node (first at line {}); merge them into one",
                        DEPS_TAG, first
                    );
                    self.diagnose(DiagnosticKind::MultipleDeps, line, message);
                    return;
                }
                pending.deps_line = Some(line);

                let (ids, problems) = parse_ids(raw);
                pending.deps.extend(ids);
                for problem in problems {
                    self.diagnose(problem.kind, line, problem.message);
                }
            }
            Tag::Unknown(name) => {
                let message = format!("unknown metadata \"@{}\" (use {} or {})", name, ID_TAG, DEPS_TAG);
                self.diagnose(DiagnosticKind::UnknownMetadata, line, message);
            }
            Tag::Text => {}
        }
    }

    /// Validates and records an id on the pending node
    fn assign_id(&mut self, value: &str, line: usize) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let label = pending.label();

        match validate_id(value) {
            Ok(()) => {
                pending.id = Some(value.to_string());
                pending.id_line = Some(line);
            }
            Err(IdError::Empty) => {
                pending.invalid = true;
                self.diagnose(DiagnosticKind::MissingId, line, format!("{} id must not be empty", label));
            }
            Err(e) => {
                pending.invalid = true;
                self.diagnose(DiagnosticKind::InvalidId, line, format!("{}: {}", label, e));
            }
        }
    }

    /// Tags trailing code are reported, never turned into nodes
    fn check_trailing(&mut self, code: &str, line: usize) {
        let Some(payload) = comment::trailing_comment(code) else {
            return;
        };

        let misplaced = match parse_tag(payload, self.options.grammar, &self.options.keywords) {
            Tag::Keyword { keyword, .. } => Some(keyword.to_ascii_uppercase()),
            Tag::Id(_) => Some(ID_TAG.to_string()),
            Tag::Deps(_) => Some(DEPS_TAG.to_string()),
            _ => None,
        };
        if let Some(label) = misplaced {
            self.diagnose(
                DiagnosticKind::MisplacedKeyword,
                line,
                format!("{} must start at a comment line", label),
            );
        }
    }

    fn flush(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.invalid {
            return;
        }

        let owned = match self.options.grammar {
            Grammar::Keyword => pending.keyword.is_some(),
            Grammar::Explicit => pending.id.is_some(),
        };
        if !owned {
            if pending.has_meta {
                let owner = match self.options.grammar {
                    Grammar::Keyword => "a keyword comment",
                    Grammar::Explicit => ID_TAG,
                };
                self.diagnose(
                    DiagnosticKind::OrphanMetadata,
                    pending.line,
                    format!("metadata without {}", owner),
                );
            }
            return;
        }

        let id = match pending.id.clone() {
            Some(id) => id,
            None if !pending.has_meta => return,
            None if self.options.derive_ids => placeholder_base(self.file, pending.line),
            None => {
                let message = format!(
                    "{} id is required (add {} <id> or {}: [#id])",
                    pending.label(),
                    ID_TAG,
                    pending.label()
                );
                self.diagnose(DiagnosticKind::MissingId, pending.line, message);
                return;
            }
        };

        if let Some(first) = self.seen.get(&id) {
            let message = format!("duplicate id \"{}\" (first defined at {}:{})", id, self.file, first);
            self.diagnose(DiagnosticKind::DuplicateId, pending.line, message);
            return;
        }
        self.seen.insert(id.clone(), pending.line);

        for parent in &pending.deps {
            self.result.edges.push(Edge::blocks(parent.clone(), id.clone()));
        }
        self.result.nodes.push(Node::new(id, self.file, pending.line));
    }
}

/// True when `payload` starts a new node under `options`
pub(crate) fn opens_node(payload: &str, options: &ScanOptions) -> bool {
    match options.grammar {
        Grammar::Keyword => match_keyword(payload, &options.keywords).is_some(),
        Grammar::Explicit => matches!(parse_tag(payload, Grammar::Explicit, &[]), Tag::Id(_)),
    }
}
