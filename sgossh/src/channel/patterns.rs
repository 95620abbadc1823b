//! Pattern matching utilities for prompt detection.

use memchr::memmem;
use regex::bytes::Regex;

/// Which pattern ended a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matched {
    /// One of the caller's interactive patterns, by position.
    Pattern(usize),

    /// The device prompt.
    Prompt,
}

/// Output of a read that stopped on a pattern match.
#[derive(Debug)]
pub struct ReadMatch {
    /// Everything read, including the matched text.
    pub data: Vec<u8>,

    /// What stopped the read.
    pub matched: Matched,
}

impl ReadMatch {
    /// Get the data as a string (lossy UTF-8).
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Compile a device prompt pattern into a regex.
///
/// Patterns without an end anchor get `\s*\z` appended, so a prompt is
/// only recognised at the very end of the received output.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') || pattern.ends_with("\\z") {
        pattern.to_string()
    } else {
        format!("{}\\s*\\z", pattern)
    };

    Regex::new(&pattern)
}

/// Compile an interactive sub-prompt pattern (e.g. `confirm?`).
///
/// These are matched anywhere in the tail, not anchored.
pub fn compile_answer_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)
}

/// Literal substring search on raw bytes.
pub fn contains_literal(haystack: &[u8], needle: &str) -> bool {
    memmem::find(haystack, needle.as_bytes()).is_some()
}
