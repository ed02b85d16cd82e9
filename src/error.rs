//! Error types for the block pipeline
//!
//! Only the boundaries that can genuinely fail carry a typed error. Everything
//! downstream of parsing degrades locally (logged and skipped) instead of
//! propagating.

use thiserror::Error;

/// Failure to turn Java source into a usable syntax tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The parser produced no tree at all (grammar not loaded or parse aborted)
    #[error("parser produced no syntax tree")]
    NoTree,

    /// The tree contains syntax errors; the first one starts at `line` (1-based)
    #[error("syntax error near line {line}")]
    Syntax { line: usize },
}

/// Rejected construction of a line span.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSpanError {
    #[error("line numbers are 1-based, got start line 0")]
    ZeroLine,

    #[error("start line {start} is after end line {end}")]
    Inverted { start: usize, end: usize },
}
