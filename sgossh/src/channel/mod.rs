//! Channel layer for pattern matching and PTY operations.
//!
//! This module turns a raw transport into prompt-aware reads,
//! including ANSI stripping and interactive pattern detection.

mod buffer;
mod patterns;
mod pty;

pub use buffer::PatternBuffer;
pub use patterns::{
    Matched, ReadMatch, compile_answer_pattern, compile_prompt_pattern, contains_literal,
};
pub use pty::PtyChannel;
