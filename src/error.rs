//! Error types for the parts of the contract that can fail synchronously.
//!
//! Per the error-handling design (validation is non-fatal and collected,
//! internal invariant violations panic), the only fallible core operations
//! are guard/update parsing and composition's update-merge conflict check.

use std::fmt;

/// A guard or update string failed to parse.
///
/// Carries the offending text and byte span so callers can render it with
/// [`crate::diag::render_parse_error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub text: String,
    pub span: (usize, usize),
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (in {:?})", self.message, self.text)
    }
}

impl std::error::Error for ParseError {}

/// Two transitions being synchronized assign different right-hand sides to
/// the same variable in the same outcome of the distribution product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionError {
    pub action: String,
    pub variable: String,
}

impl fmt::Display for CompositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conflicting assignment to `{}` while synchronizing action `{}`",
            self.variable, self.action
        )
    }
}

impl std::error::Error for CompositionError {}
