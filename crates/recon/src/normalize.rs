//! Identifier normalization.
//!
//! Every strategy is total: any input (including "") yields a String, and an
//! empty result means "no identifier". Callers must never join on an empty key.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a raw cell is turned into a join key. One strategy per join attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Lowercase, strip `pr`/`pull`/`id` prefixes and punctuation.
    StringId,
    /// Digits only.
    Digits,
    /// Lowercase + trim, used for title matching.
    Title,
}

impl KeyStrategy {
    pub fn key(&self, raw: &str) -> String {
        match self {
            Self::StringId => normalize_id(raw),
            Self::Digits => numeric_id(raw),
            Self::Title => normalize_title(raw),
        }
    }
}

impl std::fmt::Display for KeyStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StringId => write!(f, "string_id"),
            Self::Digits => write!(f, "digits"),
            Self::Title => write!(f, "title"),
        }
    }
}

fn prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:pr|pull|id)[-_#]?").expect("static regex"))
}

/// String normalization: `" PR-1234 "` → `"1234"`, `"pull_abc#9"` → `"abc9"`.
pub fn normalize_id(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = prefix_re().replace(&lowered, "");
    let cleaned: String = stripped
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_')
        .collect();
    cleaned.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Numeric extraction: every non-digit removed.
pub fn numeric_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn normalize_title(raw: &str) -> String {
    raw.trim().to_lowercase()
}
