//! Comment detection across languages
//!
//! Lines are classified one at a time by a [`Classifier`] that remembers
//! whether a multi-line block comment is open. Recognized forms:
//!
//! | Form | Opener | Closer |
//! |------|--------|--------|
//! | Line comment | `//`, `#`, `--` | end of line |
//! | C block | `/*` | `*/` |
//! | JSX block | `{/*` | `*/}` |
//! | HTML / Markdown | `<!--` | `-->` |
//! | Python docstring | `"""`, `'''` | same |
//!
//! The same classifier drives the scanner and the source editors, so both
//! agree on which lines belong to a comment.

/// Multi-line comment styles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    Slash,
    Jsx,
    Html,
    DoubleQuote,
    SingleQuote,
}

impl BlockStyle {
    fn opened_by(token: &str) -> Option<Self> {
        match token {
            "/*" => Some(BlockStyle::Slash),
            "{/*" => Some(BlockStyle::Jsx),
            "<!--" => Some(BlockStyle::Html),
            "\"\"\"" => Some(BlockStyle::DoubleQuote),
            "'''" => Some(BlockStyle::SingleQuote),
            _ => None,
        }
    }

    pub fn opener(self) -> &'static str {
        match self {
            BlockStyle::Slash => "/*",
            BlockStyle::Jsx => "{/*",
            BlockStyle::Html => "<!--",
            BlockStyle::DoubleQuote => "\"\"\"",
            BlockStyle::SingleQuote => "'''",
        }
    }

    /// Text whose presence ends the block. JSX blocks end at `*/` as well,
    /// the trailing brace is only stripped from payloads.
    pub fn closer(self) -> &'static str {
        match self {
            BlockStyle::Slash | BlockStyle::Jsx => "*/",
            BlockStyle::Html => "-->",
            BlockStyle::DoubleQuote => "\"\"\"",
            BlockStyle::SingleQuote => "'''",
        }
    }

    /// Closing text appended to a self-contained one-line comment
    pub fn line_suffix(self) -> &'static str {
        match self {
            BlockStyle::Slash => " */",
            BlockStyle::Jsx => " */}",
            BlockStyle::Html => " -->",
            BlockStyle::DoubleQuote => " \"\"\"",
            BlockStyle::SingleQuote => " '''",
        }
    }

    fn is_c_like(self) -> bool {
        matches!(self, BlockStyle::Slash | BlockStyle::Jsx)
    }
}

/// Where the classifier stands between two lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    Outside,
    InBlock(BlockStyle),
}

/// Openers that start a comment line, longest first
const OPENERS: [&str; 8] = ["{/*", "/*", "<!--", "//", "#", "--", "\"\"\"", "'''"];

/// Openers that may trail code on the same line
const TRAILING_OPENERS: [&str; 5] = ["//", "/*", "<!--", "#", "--"];

const CLOSERS: [&str; 5] = ["*/}", "*/", "-->", "\"\"\"", "'''"];

/// A commentary line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine<'a> {
    /// Text with indentation, comment delimiters and closers removed
    pub payload: &'a str,

    /// Leading comment token, if the line starts with one
    pub token: Option<&'static str>,

    /// Block the line opens, sits inside, or opens and closes itself
    pub block: Option<BlockStyle>,

    /// The block is still open after this line
    pub continues: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Empty or whitespace only, inside or outside a block
    Blank,
    Code(&'a str),
    Comment(CommentLine<'a>),
}

impl Line<'_> {
    pub fn is_comment(&self) -> bool {
        matches!(self, Line::Comment(_))
    }
}

/// Line-by-line comment state machine
#[derive(Debug, Default)]
pub struct Classifier {
    region: Region,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies the next line. A line that opens a block never closes it
    /// and a line that closes a block never reopens one.
    pub fn classify<'a>(&mut self, line: &'a str) -> Line<'a> {
        let trimmed = line.trim();

        if let Region::InBlock(style) = self.region {
            let closes = trimmed.contains(style.closer());
            if closes {
                self.region = Region::Outside;
            }
            if trimmed.is_empty() {
                return Line::Blank;
            }

            let token = leading_token(trimmed, true);
            return Line::Comment(CommentLine {
                payload: payload(trimmed, token),
                token,
                block: Some(style),
                continues: !closes,
            });
        }

        if trimmed.is_empty() {
            return Line::Blank;
        }
        let Some(token) = leading_token(trimmed, false) else {
            return Line::Code(line);
        };

        let block = BlockStyle::opened_by(token);
        let mut continues = false;
        if let Some(style) = block {
            if !trimmed[token.len()..].contains(style.closer()) {
                self.region = Region::InBlock(style);
                continues = true;
            }
        }

        Line::Comment(CommentLine {
            payload: payload(trimmed, Some(token)),
            token: Some(token),
            block,
            continues,
        })
    }
}

/// Classifies every line of a file from the top
pub fn classify_lines<'a, S: AsRef<str>>(lines: &'a [S]) -> Vec<Line<'a>> {
    let mut classifier = Classifier::new();
    lines
        .iter()
        .map(|line| classifier.classify(line.as_ref()))
        .collect()
}

fn leading_token(trimmed: &str, in_block: bool) -> Option<&'static str> {
    if let Some(token) = OPENERS.iter().copied().find(|t| trimmed.starts_with(*t)) {
        return Some(token);
    }
    if in_block && trimmed.starts_with('*') && !trimmed.starts_with("*/") {
        return Some("*");
    }
    None
}

fn payload<'a>(trimmed: &'a str, token: Option<&str>) -> &'a str {
    let mut text = trimmed;
    if let Some(token) = token {
        text = &text[token.len()..];
        // `///`, `//!`, `/**`, `##` and friends
        if let Some(repeat) = token.chars().last() {
            text = text.trim_start_matches(|c| c == repeat || c == '!');
        }
    }
    strip_closers(text)
}

/// Removes trailing comment closers and surrounding whitespace
pub fn strip_closers(text: &str) -> &str {
    let mut text = text.trim();
    while let Some(closer) = CLOSERS.iter().find(|c| text.ends_with(**c)) {
        text = text[..text.len() - closer.len()].trim_end();
    }
    text
}

/// Payload of a comment that trails code on `line`. The opener must follow
/// whitespace, which rules out `i--`, `"#fff"` and `http://`.
pub fn trailing_comment(line: &str) -> Option<&str> {
    let (idx, opener) = TRAILING_OPENERS
        .iter()
        .filter_map(|opener| {
            line.match_indices(*opener)
                .find(|(idx, _)| {
                    *idx > 0
                        && !line[..*idx].trim().is_empty()
                        && line[..*idx].ends_with(char::is_whitespace)
                })
                .map(|(idx, _)| (idx, *opener))
        })
        .min_by_key(|(idx, _)| *idx)?;

    let rest = &line[idx + opener.len()..];
    let repeat = opener.chars().last().unwrap_or(' ');
    Some(strip_closers(
        rest.trim_start_matches(|c| c == repeat || c == '!'),
    ))
}

/// Indentation of `line`
pub fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Prefix and suffix for a new comment line placed right after `line`,
/// mirroring its comment form
pub fn follow_up_delimiters(line: &str, comment: &CommentLine<'_>) -> (String, &'static str) {
    let indent = indentation(line);

    if comment.continues {
        let prefix = match (comment.block, comment.token) {
            (Some(style), Some("*")) if style.is_c_like() => format!("{}*", indent),
            (Some(style), Some(_)) if style.is_c_like() => format!("{} *", indent),
            _ => indent.to_string(),
        };
        return (prefix, "");
    }

    match comment.block {
        Some(style) => (format!("{}{}", indent, style.opener()), style.line_suffix()),
        None => (format!("{}{}", indent, comment.token.unwrap_or("//")), ""),
    }
}

/// Joins delimiters and a body into a comment line
pub fn format_comment_line(prefix: &str, body: &str, suffix: &str) -> String {
    if prefix.trim().is_empty() {
        format!("{}{}{}", prefix, body, suffix)
    } else {
        format!("{} {}{}", prefix, body, suffix)
    }
}
