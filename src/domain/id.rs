//! Identifier rules
//!
//! IDs are lowercase ASCII letters, digits, hyphens and underscores
//! (`^[a-z0-9_-]+$`). Placeholder IDs are derived from a file path and a
//! line number, e.g. `src/Main.go` line 12 becomes `src-main-go-12`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,

    #[error("id \"{0}\" must use lowercase letters, digits, hyphens, or underscores")]
    InvalidChars(String),
}

/// Checks the identifier charset
pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if !id.bytes().all(is_id_byte) {
        return Err(IdError::InvalidChars(id.to_string()));
    }
    Ok(())
}

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_'
}

/// Slug of `file` followed by `-<line>`
pub fn placeholder_base(file: &str, line: usize) -> String {
    let mut slug = String::with_capacity(file.len());
    let mut pending_hyphen = false;

    for c in file.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("todo");
    }
    format!("{}-{}", slug, line)
}

/// First of `base`, `base-1`, `base-2`, ... for which `taken` is false
pub fn unique_id(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
