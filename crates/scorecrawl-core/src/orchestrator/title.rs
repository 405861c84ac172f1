//! Post-title to directory-name mapping.

use std::collections::HashMap;

const SUBMISSION_PREFIX: &str = "[SUBMISSION]";

/// Turns a post title into a filesystem-safe directory name: path
/// separators become `|`, and the conventional "[SUBMISSION]" tag many
/// posts carry is stripped.
pub fn escape_title(title: &str) -> String {
    let escaped = title.replace('/', "|");

    let escaped = if escaped.to_uppercase().starts_with(SUBMISSION_PREFIX) {
        escaped[SUBMISSION_PREFIX.len()..].trim_start().to_string()
    } else {
        escaped
    };

    if escaped.is_empty() {
        SUBMISSION_PREFIX.to_string()
    } else {
        escaped
    }
}

/// Hands out unique target names within one run by appending a ` (n)`
/// counter to repeated titles. Process-local: the counter resets each run
/// and does not consult the resume ledger.
#[derive(Default)]
pub struct TitleCounter {
    used: HashMap<String, u32>,
}

impl TitleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a name for `title`: the title itself on first use, then
    /// `"title (1)"`, `"title (2)"`, …
    pub fn claim(&mut self, title: &str) -> String {
        let count = self.used.entry(title.to_string()).or_insert(0);
        let name = if *count == 0 {
            title.to_string()
        } else {
            format!("{title} ({count})")
        };
        *count += 1;
        name
    }
}
