//! Error pattern matching
//!
//! Patterns are plain regular expressions searched anywhere in the text.
//! A pattern that does not compile never matches and never stops the
//! remaining patterns from being checked.

use crate::error::{OperatorError, Result};
use regex::Regex;
use tracing::error;

/// Check whether `pattern` occurs anywhere in `text`.
pub fn matches(pattern: &str, text: &str) -> Result<bool> {
    Ok(compile(pattern)?.is_match(text))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| OperatorError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// The compiled error patterns of one policy, in configured order.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<(String, Regex)>,
}

impl PatternSet {
    /// Compile `patterns`, logging and dropping any that are invalid.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|raw| {
                let raw = raw.as_ref();
                match compile(raw) {
                    Ok(regex) => Some((raw.to_string(), regex)),
                    Err(e) => {
                        error!(pattern = %raw, error = %e, "Error matching pattern");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    /// Return the first pattern, in configured order, found in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map(|(raw, _)| raw.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
