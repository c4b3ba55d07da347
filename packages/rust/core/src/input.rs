//! Validation of interactive user input.
//!
//! Each function turns raw text into a typed value or a
//! [`PromptKitError::Validation`] describing what to fix. The CLI decides
//! whether to ask again.

use std::sync::LazyLock;

use promptkit_shared::{PromptKitError, Result};
use regex::Regex;

/// Most keywords accepted for one ads search.
pub const MAX_KEYWORDS: usize = 5;

static KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-]+$").expect("keyword regex"));

/// Parse a comma-separated keyword list.
///
/// One to five keywords, each 2..=50 characters of letters, digits, spaces
/// and hyphens.
pub fn parse_keywords(input: &str) -> Result<Vec<String>> {
    let keywords: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect();

    if keywords.is_empty() {
        return Err(PromptKitError::validation("enter at least one keyword"));
    }
    if keywords.len() > MAX_KEYWORDS {
        return Err(PromptKitError::validation(format!(
            "at most {MAX_KEYWORDS} keywords allowed, got {}",
            keywords.len()
        )));
    }

    for keyword in &keywords {
        let len = keyword.chars().count();
        if !(2..=50).contains(&len) {
            return Err(PromptKitError::validation(format!(
                "keyword '{keyword}' must be between 2 and 50 characters"
            )));
        }
        if !KEYWORD_RE.is_match(keyword) {
            return Err(PromptKitError::validation(format!(
                "keyword '{keyword}' contains invalid characters"
            )));
        }
    }

    Ok(keywords)
}

/// Largest row count one datagen run accepts.
pub const MAX_ROW_COUNT: usize = 10_000;

/// Parse a row count between 1 and [`MAX_ROW_COUNT`].
pub fn parse_row_count(input: &str) -> Result<usize> {
    match input.trim().parse::<usize>() {
        Ok(0) => Err(PromptKitError::validation("row count must be at least 1")),
        Ok(n) if n > MAX_ROW_COUNT => Err(PromptKitError::validation(format!(
            "row count must be at most {MAX_ROW_COUNT}"
        ))),
        Ok(n) => Ok(n),
        Err(_) => Err(PromptKitError::validation(format!(
            "'{}' is not a whole number",
            input.trim()
        ))),
    }
}

/// Require non-blank text, returned trimmed.
pub fn require_text(label: &str, input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PromptKitError::validation(format!("{label} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Parse a yes/no answer.
pub fn parse_yes_no(input: &str) -> Result<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        other => Err(PromptKitError::validation(format!("answer yes or no, not '{other}'"))),
    }
}

/// Whether the user typed the loop's exit word (case-insensitive).
pub fn is_exit(input: &str, word: &str) -> bool {
    input.trim().eq_ignore_ascii_case(word)
}
