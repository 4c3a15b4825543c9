//! Flag detection.
//!
//! Lessons hide success markers in file bodies and command output. Every
//! produced line is scanned for the marker pattern; each distinct flag
//! token fires at most once per session, no matter how many times it is
//! printed.

use std::collections::HashSet;

/// Default marker prefix; a flag runs from here through the closing `}`.
pub const DEFAULT_FLAG_PREFIX: &str = "yadika{";

/// Scans output text for flag tokens and deduplicates them.
pub struct FlagDetector {
    prefix: String,
    seen: HashSet<String>,
}

impl FlagDetector {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            seen: HashSet::new(),
        }
    }

    /// Flags in `text` not seen before in this session, in order of
    /// appearance. An unterminated marker (no closing brace) is ignored.
    pub fn scan(&mut self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find(&self.prefix) {
            let candidate = &rest[start..];
            let Some(end) = candidate.find('}') else {
                break;
            };
            let token = &candidate[..=end];
            if self.seen.insert(token.to_string()) {
                found.push(token.to_string());
            }
            rest = &candidate[end + 1..];
        }
        found
    }
}

impl Default for FlagDetector {
    fn default() -> Self {
        Self::new(DEFAULT_FLAG_PREFIX)
    }
}
