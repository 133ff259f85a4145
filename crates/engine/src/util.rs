//! Internal helpers for name validation and normalization.
//!
//! These utilities are **not** part of the public API. They centralize the
//! rules that turn user-typed names into stable keys so members and
//! categories compare the same way everywhere.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, ResultEngine};

/// Trim and collapse internal whitespace, rejecting empty input.
pub(crate) fn normalize_display(input: &str, label: &str) -> ResultEngine<String> {
    let mut out = String::new();
    for token in input.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    if out.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(out)
}

/// Fold a name to its comparison key: accents stripped, lower-cased,
/// non-alphanumeric runs collapsed to a single `-`.
pub(crate) fn normalize_key(input: &str, label: &str) -> ResultEngine<String> {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_sep = false;
        } else if !out.is_empty() && !prev_sep {
            out.push('-');
            prev_sep = true;
        }
    }
    let key = out.trim_end_matches('-');
    if key.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must contain letters or digits"
        )));
    }
    Ok(key.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
