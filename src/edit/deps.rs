//! Rewrites the `@deps` line of a node

use std::path::Path;

use tracing::debug;

use super::{line_like, replace_payload, EditError, SourceFile};
use crate::domain::Graph;
use crate::scanner::comment::{classify_lines, follow_up_delimiters, format_comment_line, indentation, CommentLine, Line};
use crate::scanner::metadata::{parse_tag, Tag};
use crate::scanner::{opens_node, Grammar, ScanOptions, DEPS_TAG};

/// What to remove with [`detach_dependency`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detach<'a> {
    Parent(&'a str),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmptyList {
    Reject,
    Allow,
}

/// A planned change to a file's lines
#[derive(Debug, PartialEq, Eq)]
enum LineEdit {
    Replace(usize, String),
    Insert(usize, String),
    Remove(usize),
    Unchanged,
}

/// Makes `parents` the only parents of `target`. The list must not be
/// empty; use [`clear_dependencies`] to drop them all.
pub fn set_dependencies(
    root: &Path,
    graph: &Graph,
    target: &str,
    parents: &[String],
    options: &ScanOptions,
) -> Result<(), EditError> {
    update(root, graph, target, parents, options, EmptyList::Reject)
}

/// Removes the `@deps` line of `target`
pub fn clear_dependencies(root: &Path, graph: &Graph, target: &str, options: &ScanOptions) -> Result<(), EditError> {
    update(root, graph, target, &[], options, EmptyList::Allow)
}

/// Removes one parent, or every parent, from `target`
pub fn detach_dependency(
    root: &Path,
    graph: &Graph,
    target: &str,
    detach: Detach<'_>,
    options: &ScanOptions,
) -> Result<(), EditError> {
    if !graph.contains(target) {
        return Err(EditError::NodeNotFound(target.to_string()));
    }

    let remaining = match detach {
        Detach::All => Vec::new(),
        Detach::Parent(parent) => {
            if !graph.contains(parent) {
                return Err(EditError::ParentNotFound(parent.to_string()));
            }
            let current = graph.parents_of(target);
            if !current.iter().any(|p| p == parent) {
                return Err(EditError::NotAParent {
                    parent: parent.to_string(),
                    child: target.to_string(),
                });
            }
            current.into_iter().filter(|p| p != parent).collect()
        }
    };

    update(root, graph, target, &remaining, options, EmptyList::Allow)
}

fn update(
    root: &Path,
    graph: &Graph,
    target: &str,
    parents: &[String],
    options: &ScanOptions,
    empty: EmptyList,
) -> Result<(), EditError> {
    let node = graph
        .node(target)
        .ok_or_else(|| EditError::NodeNotFound(target.to_string()))?;

    if parents.is_empty() && empty == EmptyList::Reject {
        return Err(EditError::EmptyParents);
    }
    if let Some(missing) = parents.iter().find(|p| !graph.contains(p.as_str())) {
        return Err(EditError::ParentNotFound(missing.clone()));
    }

    let mut unique: Vec<&str> = Vec::with_capacity(parents.len());
    for parent in parents {
        if !unique.contains(&parent.as_str()) {
            unique.push(parent);
        }
    }

    let mut source = SourceFile::open(&root.join(&node.file))?;
    let edit = plan(&source.lines, node.line, &unique, options).map_err(|e| match e {
        PlanError::OutOfRange => EditError::LineOutOfRange {
            file: node.file.clone(),
            line: node.line,
        },
        PlanError::NotAComment => EditError::NotAComment {
            file: node.file.clone(),
            line: node.line,
        },
        PlanError::MultipleDeps => EditError::MultipleDeps {
            id: node.id.clone(),
            file: node.file.clone(),
        },
    })?;

    debug!(node = %node.id, edit = ?edit, "planned @deps edit");
    match edit {
        LineEdit::Replace(idx, line) => source.lines[idx] = line,
        LineEdit::Insert(idx, line) => source.lines.insert(idx, line),
        LineEdit::Remove(idx) => {
            source.lines.remove(idx);
        }
        LineEdit::Unchanged => return Ok(()),
    }
    source.save()
}

#[derive(Debug)]
enum PlanError {
    OutOfRange,
    NotAComment,
    MultipleDeps,
}

/// Decides how to rewrite the metadata run that starts at 1-based `line`
fn plan(lines: &[String], line: usize, parents: &[&str], options: &ScanOptions) -> Result<LineEdit, PlanError> {
    let idx = line
        .checked_sub(1)
        .filter(|idx| *idx < lines.len())
        .ok_or(PlanError::OutOfRange)?;

    let classes = classify_lines(lines);
    let Line::Comment(declaring) = &classes[idx] else {
        return Err(PlanError::NotAComment);
    };

    // Walk the comment run the same way the scanner groups a pending node
    let mut insert_after = (idx, declaring);
    let mut deps_lines = Vec::new();
    for (i, class) in classes.iter().enumerate().skip(idx + 1) {
        let Line::Comment(comment) = class else {
            break;
        };
        if opens_node(comment.payload, options) {
            break;
        }
        match parse_tag(comment.payload, options.grammar, &options.keywords) {
            Tag::Id(_) if options.grammar == Grammar::Keyword => insert_after = (i, comment),
            Tag::Deps(_) => deps_lines.push((i, comment)),
            _ => {}
        }
    }

    if deps_lines.len() > 1 {
        return Err(PlanError::MultipleDeps);
    }
    let body = format!("{} {}", DEPS_TAG, parents.join(", "));

    let edit = match (deps_lines.first(), parents.is_empty()) {
        (Some((i, comment)), true) => {
            let raw = &lines[*i];
            if carries_block_delimiter(raw, comment) {
                match strip_payload(raw, comment) {
                    Some(stripped) => LineEdit::Replace(*i, stripped),
                    None => return Err(PlanError::NotAComment),
                }
            } else {
                LineEdit::Remove(*i)
            }
        }
        (Some((i, comment)), false) => {
            let raw = &lines[*i];
            let replaced = replace_payload(raw, comment.payload, &body).unwrap_or_else(|| {
                let (prefix, suffix) = follow_up_delimiters(raw, comment);
                line_like(raw, format_comment_line(&prefix, &body, suffix))
            });
            LineEdit::Replace(*i, replaced)
        }
        (None, true) => LineEdit::Unchanged,
        (None, false) => {
            let (after, comment) = insert_after;
            let raw = &lines[after];
            let (prefix, suffix) = follow_up_delimiters(raw, comment);
            LineEdit::Insert(after + 1, line_like(raw, format_comment_line(&prefix, &body, suffix)))
        }
    };
    Ok(edit)
}

/// True when `raw` opens a block that it leaves open, or closes a block it
/// did not open. Deleting such a line would unbalance the comment.
fn carries_block_delimiter(raw: &str, comment: &CommentLine<'_>) -> bool {
    let Some(style) = comment.block else {
        return false;
    };
    let text = raw.trim();
    let opens = text.starts_with(style.opener());
    let rest = if opens { &text[style.opener().len()..] } else { text };
    opens != rest.contains(style.closer())
}

/// `raw` without its payload, keeping indentation and delimiters
fn strip_payload(raw: &str, comment: &CommentLine<'_>) -> Option<String> {
    let text = raw.strip_suffix('\r').unwrap_or(raw);
    let start = text.find(comment.payload)?;
    let before = &text[..start];
    let after = text[start + comment.payload.len()..].trim();

    // ` * @deps a */` collapses to ` */`
    let before = if before.trim().is_empty() || (comment.token == Some("*") && after.starts_with("*/")) {
        indentation(text)
    } else {
        before.trim_end()
    };
    let stripped = if after.is_empty() || before.trim().is_empty() {
        format!("{}{}", before, after)
    } else {
        format!("{} {}", before, after)
    };
    Some(line_like(raw, stripped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> (TempDir, Graph) {
        let dir = TempDir::new().unwrap();
        for (name, body) in files {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, body).unwrap();
        }
        let graph = scan(dir.path(), &ScanOptions::default()).unwrap().graph;
        (dir, graph)
    }

    fn read(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join(name)).unwrap()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn inserts_deps_after_keyword_line() {
        let (dir, graph) = setup(&[
            ("a.go", "// TODO: [#a]\nfunc a() {}\n"),
            ("b.go", "package b\n\n  // TODO: [#b] wire it\nfunc b() {}\n"),
        ]);

        set_dependencies(dir.path(), &graph, "b", &ids(&["a"]), &ScanOptions::default()).unwrap();

        assert_eq!(read(&dir, "b.go"), "package b\n\n  // TODO: [#b] wire it\n  // @deps a\nfunc b() {}\n");
        let rescanned = scan(dir.path(), &ScanOptions::default()).unwrap().graph;
        assert_eq!(rescanned.parents_of("b"), vec!["a"]);
    }

    #[test]
    fn inserts_after_id_line() {
        let (dir, graph) = setup(&[
            ("a.py", "# TODO: [#a]\n"),
            ("b.py", "# FIXME: slow\n# @id b\n# more words\nx = 1\n"),
        ]);

        set_dependencies(dir.path(), &graph, "b", &ids(&["a"]), &ScanOptions::default()).unwrap();
        assert_eq!(read(&dir, "b.py"), "# FIXME: slow\n# @id b\n# @deps a\n# more words\nx = 1\n");
    }

    #[test]
    fn replaces_existing_deps_line() {
        let (dir, graph) = setup(&[
            ("x.go", "// TODO: [#a]\n// TODO: [#b]\n// TODO: [#c]\n// @deps a\n"),
        ]);

        set_dependencies(dir.path(), &graph, "c", &ids(&["a", "b"]), &ScanOptions::default()).unwrap();
        assert_eq!(read(&dir, "x.go"), "// TODO: [#a]\n// TODO: [#b]\n// TODO: [#c]\n// @deps a, b\n");
    }

    #[test]
    fn block_comment_gets_block_delimiters() {
        let (dir, graph) = setup(&[
            ("a.ts", "/* TODO: [#a] */\n"),
            ("b.ts", "/**\n * TODO: [#b]\n */\n"),
            ("c.html", "<!-- TODO: [#c] -->\n"),
        ]);
        let options = ScanOptions::default();

        set_dependencies(dir.path(), &graph, "b", &ids(&["a"]), &options).unwrap();
        set_dependencies(dir.path(), &graph, "c", &ids(&["a"]), &options).unwrap();
        set_dependencies(dir.path(), &graph, "a", &ids(&["c"]), &options).unwrap();

        assert_eq!(read(&dir, "b.ts"), "/**\n * TODO: [#b]\n * @deps a\n */\n");
        assert_eq!(read(&dir, "c.html"), "<!-- TODO: [#c] -->\n<!-- @deps a -->\n");
        assert_eq!(read(&dir, "a.ts"), "/* TODO: [#a] */\n/* @deps c */\n");
    }

    #[test]
    fn block_delimiters_survive_deps_rewrite() {
        let (dir, graph) = setup(&[
            ("a.c", "/* TODO: [#a] */\n/* TODO: [#c]\n * @deps a */\nint x;\n"),
            ("b.html", "<!-- TODO: [#b]\n  @deps a -->\n<p>\n"),
            ("d.c", "// TODO: [#d]\n/* @deps a\n */\nint y;\n"),
        ]);
        let options = ScanOptions::default();

        set_dependencies(dir.path(), &graph, "c", &ids(&["a", "b"]), &options).unwrap();
        set_dependencies(dir.path(), &graph, "b", &ids(&["a", "d"]), &options).unwrap();
        set_dependencies(dir.path(), &graph, "d", &ids(&["b"]), &options).unwrap();

        assert_eq!(read(&dir, "a.c"), "/* TODO: [#a] */\n/* TODO: [#c]\n * @deps a, b */\nint x;\n");
        assert_eq!(read(&dir, "b.html"), "<!-- TODO: [#b]\n  @deps a, d -->\n<p>\n");
        assert_eq!(read(&dir, "d.c"), "// TODO: [#d]\n/* @deps b\n */\nint y;\n");
    }

    #[test]
    fn removing_deps_keeps_block_closer() {
        let (dir, graph) = setup(&[
            ("a.c", "/* TODO: [#a] */\n/* TODO: [#c]\n * @deps a */\nint x;\n// TODO: [#z]\n"),
            ("b.html", "<!-- TODO: [#b]\n  @deps a -->\n<p>\n"),
        ]);
        let options = ScanOptions::default();

        detach_dependency(dir.path(), &graph, "c", Detach::All, &options).unwrap();
        detach_dependency(dir.path(), &graph, "b", Detach::Parent("a"), &options).unwrap();

        assert_eq!(read(&dir, "a.c"), "/* TODO: [#a] */\n/* TODO: [#c]\n */\nint x;\n// TODO: [#z]\n");
        assert_eq!(read(&dir, "b.html"), "<!-- TODO: [#b]\n  -->\n<p>\n");

        let rescanned = scan(dir.path(), &options).unwrap();
        assert!(rescanned.diagnostics.is_empty(), "{:?}", rescanned.diagnostics);
        assert!(rescanned.graph.contains("z"));
        assert!(rescanned.graph.edges.is_empty());
    }

    #[test]
    fn removing_deps_keeps_block_opener() {
        let (dir, graph) = setup(&[("a.c", "// TODO: [#a]\n// TODO: [#d]\n/* @deps a\n */\nint y;\n// TODO: [#z]\n")]);
        let options = ScanOptions::default();

        detach_dependency(dir.path(), &graph, "d", Detach::All, &options).unwrap();

        assert_eq!(read(&dir, "a.c"), "// TODO: [#a]\n// TODO: [#d]\n/*\n */\nint y;\n// TODO: [#z]\n");
        let rescanned = scan(dir.path(), &options).unwrap();
        assert!(rescanned.graph.contains("z"));
        assert!(rescanned.graph.parents_of("d").is_empty());
    }

    #[test]
    fn removing_deps_drops_whole_self_contained_lines() {
        let lines = ids(&["/* TODO: [#c] */", "/* @deps a */", "/*", " * TODO: [#d]", " * @deps a", " */"]);
        let options = ScanOptions::default();
        assert_eq!(plan(&lines, 1, &[], &options).unwrap(), LineEdit::Remove(1));
        assert_eq!(plan(&lines, 4, &[], &options).unwrap(), LineEdit::Remove(4));
    }

    #[test]
    fn non_utf8_file_is_left_untouched() {
        let dir = TempDir::new().unwrap();
        let body: &[u8] = b"// TODO: [#a]\n// TODO: [#b] caf\xe9\nx()\n";
        fs::write(dir.path().join("a.go"), body).unwrap();
        let graph = scan(dir.path(), &ScanOptions::default()).unwrap().graph;
        assert!(graph.contains("b"));

        let err = set_dependencies(dir.path(), &graph, "b", &ids(&["a"]), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, EditError::NotUtf8 { .. }));
        assert_eq!(fs::read(dir.path().join("a.go")).unwrap(), body);
    }

    #[test]
    fn empty_parents_rejected_without_allow() {
        let (dir, graph) = setup(&[("a.go", "// TODO: [#a]\n")]);
        let err = set_dependencies(dir.path(), &graph, "a", &[], &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, EditError::EmptyParents));
    }

    #[test]
    fn unknown_nodes_rejected_before_writing() {
        let (dir, graph) = setup(&[("a.go", "// TODO: [#a]\n")]);
        let options = ScanOptions::default();

        let err = set_dependencies(dir.path(), &graph, "zzz", &ids(&["a"]), &options).unwrap_err();
        assert!(matches!(err, EditError::NodeNotFound(_)));

        let err = set_dependencies(dir.path(), &graph, "a", &ids(&["ghost"]), &options).unwrap_err();
        assert!(matches!(err, EditError::ParentNotFound(_)));
        assert_eq!(read(&dir, "a.go"), "// TODO: [#a]\n");
    }

    #[test]
    fn multiple_deps_lines_rejected() {
        let (dir, graph) = setup(&[
            ("a.go", "// TODO: [#a]\n// TODO: [#b]\n// @deps a\n// @deps a\n"),
        ]);
        let err = set_dependencies(dir.path(), &graph, "b", &ids(&["a"]), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, EditError::MultipleDeps { .. }));
    }

    #[test]
    fn detach_one_parent() {
        let (dir, graph) = setup(&[
            ("x.go", "// TODO: [#a]\n// TODO: [#b]\n// TODO: [#c]\n// @deps a, b\n"),
        ]);

        detach_dependency(dir.path(), &graph, "c", Detach::Parent("a"), &ScanOptions::default()).unwrap();
        assert_eq!(read(&dir, "x.go"), "// TODO: [#a]\n// TODO: [#b]\n// TODO: [#c]\n// @deps b\n");
    }

    #[test]
    fn detach_last_parent_removes_line() {
        let (dir, graph) = setup(&[("x.go", "// TODO: [#a]\n\n// TODO: [#c]\n// @deps a\ncode()\n")]);

        detach_dependency(dir.path(), &graph, "c", Detach::Parent("a"), &ScanOptions::default()).unwrap();
        assert_eq!(read(&dir, "x.go"), "// TODO: [#a]\n\n// TODO: [#c]\ncode()\n");
    }

    #[test]
    fn detach_all() {
        let (dir, graph) = setup(&[("x.go", "// TODO: [#a]\n// TODO: [#b]\n// TODO: [#c]\n// @deps a, b\n")]);

        detach_dependency(dir.path(), &graph, "c", Detach::All, &ScanOptions::default()).unwrap();
        assert_eq!(read(&dir, "x.go"), "// TODO: [#a]\n// TODO: [#b]\n// TODO: [#c]\n");
    }

    #[test]
    fn detach_non_parent_fails() {
        let (dir, graph) = setup(&[("x.go", "// TODO: [#a]\n// TODO: [#b]\n// @deps a\n")]);
        let err = detach_dependency(dir.path(), &graph, "a", Detach::Parent("b"), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, EditError::NotAParent { .. }));
    }

    #[test]
    fn crlf_is_preserved() {
        let (dir, graph) = setup(&[("a.go", "// TODO: [#a]\r\n// TODO: [#b]\r\nx()\r\n")]);
        set_dependencies(dir.path(), &graph, "b", &ids(&["a"]), &ScanOptions::default()).unwrap();
        assert_eq!(read(&dir, "a.go"), "// TODO: [#a]\r\n// TODO: [#b]\r\n// @deps a\r\nx()\r\n");
    }

    #[test]
    fn plan_rejects_out_of_range_line() {
        let lines = ids(&["// TODO: [#a]"]);
        let result = plan(&lines, 5, &["b"], &ScanOptions::default());
        assert!(matches!(result, Err(PlanError::OutOfRange)));
    }

    #[test]
    fn explicit_grammar_inserts_after_id_line() {
        let options = ScanOptions::default().with_grammar(Grammar::Explicit);
        let lines = ids(&["// @id a", "// notes", "// @id b"]);
        let edit = plan(&lines, 1, &["b"], &options).unwrap();
        assert_eq!(edit, LineEdit::Insert(1, "// @deps b".to_string()));
    }
}
