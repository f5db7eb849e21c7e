//! Generated ids for tagged comments that lack one

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::{line_like, replace_payload, EditError, SourceFile};
use crate::domain::{placeholder_base, unique_id, Diagnostic, Node};
use crate::scanner::comment::{classify_lines, follow_up_delimiters, format_comment_line, Line};
use crate::scanner::metadata::{parse_tag, Tag};
use crate::scanner::{scan, ScanOptions, ID_TAG};

/// Outcome of [`insert_missing_id_placeholders`]
#[derive(Debug, Default, Serialize)]
pub struct FixReport {
    /// Nodes that received a generated id
    pub added: Vec<Node>,

    /// Every missing-id diagnostic found before editing
    pub missing: Vec<Diagnostic>,

    /// Diagnostics this pass does not address
    pub others: Vec<Diagnostic>,
}

struct Planned {
    line: usize,
    id: String,
}

/// Scans `root` and gives every missing-id diagnostic a generated id,
/// rewriting each affected file once
pub fn insert_missing_id_placeholders(root: &Path, options: &ScanOptions) -> Result<FixReport, EditError> {
    let output = scan(root, options)?;
    let (missing, others): (Vec<Diagnostic>, Vec<Diagnostic>) =
        output.diagnostics.into_iter().partition(Diagnostic::is_missing_id);

    let mut taken: BTreeSet<String> = output.graph.nodes.keys().cloned().collect();
    let mut by_file: BTreeMap<&str, Vec<Planned>> = BTreeMap::new();
    for diagnostic in &missing {
        let id = unique_id(&placeholder_base(&diagnostic.file, diagnostic.line), |c| taken.contains(c));
        taken.insert(id.clone());
        by_file.entry(diagnostic.file.as_str()).or_default().push(Planned {
            line: diagnostic.line,
            id,
        });
    }

    let mut report = FixReport {
        added: Vec::new(),
        missing: Vec::new(),
        others,
    };
    for (file, mut planned) in by_file {
        planned.sort_by_key(|p| p.line);
        let mut source = SourceFile::open(&root.join(file))?;
        let added = apply(file, &mut source.lines, &planned, options);
        if !added.is_empty() {
            source.save()?;
            report.added.extend(added);
        }
    }
    report.missing = missing;

    info!(added = report.added.len(), remaining = report.others.len(), "placeholder pass finished");
    Ok(report)
}

/// Edits `lines` for each planned id; returns the nodes that were fixed
fn apply(file: &str, lines: &mut Vec<String>, planned: &[Planned], options: &ScanOptions) -> Vec<Node> {
    let original = lines.clone();
    let classes = classify_lines(&original);
    let mut added = Vec::new();
    let mut offset = 0;

    for item in planned {
        let found = item.line.checked_sub(1).and_then(|i| classes.get(i).map(|line| (i, line)));
        let Some((idx, Line::Comment(comment))) = found else {
            warn!(file, line = item.line, "no comment at missing-id line, skipped");
            continue;
        };
        let raw = &original[idx];
        let at = idx + offset;

        match parse_tag(comment.payload, options.grammar, &options.keywords) {
            Tag::Id("") => {
                let Some(filled) = replace_payload(raw, comment.payload, &format!("{} {}", ID_TAG, item.id)) else {
                    continue;
                };
                lines[at] = filled;
            }
            Tag::Keyword {
                inline_id: Some(""), ..
            } => {
                let Some(filled) = fill_brackets(raw, comment.payload, &item.id) else {
                    continue;
                };
                lines[at] = filled;
            }
            Tag::Keyword { inline_id: None, .. } => {
                let (prefix, suffix) = follow_up_delimiters(raw, comment);
                let body = format!("{} {}", ID_TAG, item.id);
                lines.insert(at + 1, line_like(raw, format_comment_line(&prefix, &body, suffix)));
                offset += 1;
            }
            _ => {
                warn!(file, line = item.line, "unrecognized missing-id line, skipped");
                continue;
            }
        }
        added.push(Node::new(item.id.clone(), file, item.line));
    }
    added
}

/// Puts `#id` between the empty brackets that follow the keyword
fn fill_brackets(raw: &str, payload: &str, id: &str) -> Option<String> {
    let start = raw.find(payload)?;
    let open = start + payload.find('[')?;
    let close = open + raw[open..].find(']')?;
    Some(format!("{}[#{}]{}", &raw[..open], id, &raw[close + 1..]))
}
