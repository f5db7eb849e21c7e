//! Metadata tags inside comment payloads
//!
//! Two grammars are supported:
//!
//! - [`Grammar::Keyword`]: a keyword line (`TODO: [#id] text`) opens a node,
//!   followed by optional `@id <id>` and `@deps <a>, <b>` lines.
//! - [`Grammar::Explicit`]: an `@id <id>` line opens a node, `@deps` lines
//!   attach to it, keywords carry no meaning.

use serde::{Deserialize, Serialize};

use crate::domain::{validate_id, DiagnosticKind};

/// Keywords recognized when the caller does not override them
pub const DEFAULT_KEYWORDS: [&str; 7] = ["TODO", "FIXME", "NOTE", "WARNING", "HACK", "CHANGED", "REVIEW"];

pub const ID_TAG: &str = "@id";
pub const DEPS_TAG: &str = "@deps";

/// Which lines open a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grammar {
    #[default]
    Keyword,
    Explicit,
}

/// Meaning of one comment payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag<'a> {
    /// `keyword` is the text as written; `inline_id` is the bracketed id,
    /// `Some("")` for empty brackets
    Keyword {
        keyword: &'a str,
        inline_id: Option<&'a str>,
    },
    Id(&'a str),
    Deps(&'a str),
    Unknown(&'a str),
    Text,
}

/// Interprets a payload. Keywords are ignored unless `grammar` is
/// [`Grammar::Keyword`].
pub fn parse_tag<'a>(payload: &'a str, grammar: Grammar, keywords: &[String]) -> Tag<'a> {
    if let Some(rest) = payload.strip_prefix('@') {
        let end = rest
            .find(|c: char| c.is_whitespace() || c == ':')
            .unwrap_or(rest.len());
        let name = &rest[..end];
        let value = rest[end..].trim_start();
        let value = value.strip_prefix(':').unwrap_or(value).trim();

        return if name.eq_ignore_ascii_case(&ID_TAG[1..]) {
            Tag::Id(value)
        } else if name.eq_ignore_ascii_case(&DEPS_TAG[1..]) {
            Tag::Deps(value)
        } else {
            Tag::Unknown(name)
        };
    }

    if grammar == Grammar::Keyword {
        if let Some((keyword, rest)) = match_keyword(payload, keywords) {
            return Tag::Keyword {
                keyword,
                inline_id: inline_id(rest),
            };
        }
    }

    Tag::Text
}

/// Splits `payload` into a leading keyword and the remaining text.
///
/// The keyword matches case-insensitively and must be followed by the end
/// of the payload, `:`, `[`, `(` or whitespace.
pub fn match_keyword<'a>(payload: &'a str, keywords: &[String]) -> Option<(&'a str, &'a str)> {
    keywords.iter().find_map(|keyword| {
        let len = keyword.len();
        if payload.len() < len || !payload.is_char_boundary(len) {
            return None;
        }
        let (head, rest) = payload.split_at(len);
        if !head.eq_ignore_ascii_case(keyword) {
            return None;
        }
        match rest.chars().next() {
            None | Some(':') | Some('[') | Some('(') => Some((head, rest)),
            Some(c) if c.is_whitespace() => Some((head, rest)),
            _ => None,
        }
    })
}

/// `[#id]` after a keyword, optionally behind `(owner)` and a colon
fn inline_id(rest: &str) -> Option<&str> {
    let mut rest = rest.trim_start();
    if rest.starts_with('(') {
        rest = rest[rest.find(')')? + 1..].trim_start();
    }
    let rest = rest.strip_prefix(':').unwrap_or(rest).trim_start();
    let inner = rest.strip_prefix('[')?;
    let inner = &inner[..inner.find(']')?];
    let inner = inner.trim();
    Some(inner.strip_prefix('#').unwrap_or(inner).trim())
}

/// A problem found in an id list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdProblem {
    pub kind: DiagnosticKind,
    pub message: String,
}

const COMMA_HINT: &str = "ids must be comma-separated (e.g. a, b)";

/// Parses a comma-separated id list, skipping empty and invalid entries.
///
/// A space-separated list without any comma is rejected as a whole.
pub fn parse_ids(raw: &str) -> (Vec<String>, Vec<IdProblem>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (Vec::new(), Vec::new());
    }

    if !raw.contains(',') && raw.contains(char::is_whitespace) {
        return (
            Vec::new(),
            vec![IdProblem {
                kind: DiagnosticKind::SpaceSeparated,
                message: COMMA_HINT.to_string(),
            }],
        );
    }

    let mut ids = Vec::new();
    let mut problems = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if part.contains(char::is_whitespace) {
            problems.push(IdProblem {
                kind: DiagnosticKind::SpaceSeparated,
                message: COMMA_HINT.to_string(),
            });
            continue;
        }
        match validate_id(part) {
            Ok(()) => ids.push(part.to_string()),
            Err(e) => problems.push(IdProblem {
                kind: DiagnosticKind::InvalidId,
                message: e.to_string(),
            }),
        }
    }
    (ids, problems)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
    }

    fn tag(payload: &str) -> Tag<'_> {
        parse_tag(payload, Grammar::Keyword, &keywords())
    }

    #[test]
    fn keyword_with_inline_id() {
        assert_eq!(
            tag("TODO: [#cache-layer] add caching"),
            Tag::Keyword { keyword: "TODO", inline_id: Some("cache-layer") }
        );
        assert_eq!(
            tag("fixme[b]"),
            Tag::Keyword { keyword: "fixme", inline_id: Some("b") }
        );
        assert_eq!(
            tag("HACK(alice): [#x] later"),
            Tag::Keyword { keyword: "HACK", inline_id: Some("x") }
        );
    }

    #[test]
    fn keyword_without_id() {
        assert_eq!(tag("NOTE: keep"), Tag::Keyword { keyword: "NOTE", inline_id: None });
        assert_eq!(tag("Todo"), Tag::Keyword { keyword: "Todo", inline_id: None });
        assert_eq!(tag("TODO: [#]"), Tag::Keyword { keyword: "TODO", inline_id: Some("") });
    }

    #[test]
    fn keyword_needs_boundary() {
        assert_eq!(tag("TODOS are nice"), Tag::Text);
        assert_eq!(tag("notes"), Tag::Text);
    }

    #[test]
    fn explicit_grammar_ignores_keywords() {
        assert_eq!(parse_tag("TODO: [#a]", Grammar::Explicit, &keywords()), Tag::Text);
    }

    #[test]
    fn metadata_tags() {
        assert_eq!(tag("@id db"), Tag::Id("db"));
        assert_eq!(tag("@id: db"), Tag::Id("db"));
        assert_eq!(tag("@ID"), Tag::Id(""));
        assert_eq!(tag("@deps a, b"), Tag::Deps("a, b"));
        assert_eq!(tag("@param x"), Tag::Unknown("param"));
        assert_eq!(tag("@identity x"), Tag::Unknown("identity"));
    }

    #[test]
    fn ids_are_comma_separated() {
        let (ids, problems) = parse_ids("a, b,,c");
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(problems.is_empty());

        let (ids, problems) = parse_ids("a b");
        assert!(ids.is_empty());
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].kind, DiagnosticKind::SpaceSeparated);
        assert!(problems[0].message.contains("comma-separated"));
    }

    #[test]
    fn bad_entries_are_skipped() {
        let (ids, problems) = parse_ids("ok, Bad, x y");
        assert_eq!(ids, vec!["ok"]);
        let kinds: Vec<_> = problems.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::InvalidId, DiagnosticKind::SpaceSeparated]);
    }
}
