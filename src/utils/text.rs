// src/utils/text.rs

//! Text cleanup helpers for extracted page content.

use std::sync::LazyLock;

use regex::Regex;

static MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("Failed to build newline pattern"));

static LEADING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s+").expect("Failed to build indentation pattern"));

/// Collapse runs of blank lines, strip per-line indentation and trim the ends.
pub fn squash_whitespace(text: &str) -> String {
    let text = MULTI_NEWLINE.replace_all(text, "\n");
    let text = LEADING_SPACE.replace_all(&text, "");
    text.trim().to_string()
}
