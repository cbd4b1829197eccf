//! Error types for assertion evaluation

use thiserror::Error;

/// Assertion evaluation error enumeration
///
/// Ordinary mismatches are not errors; they come back as failed
/// [`AssertionResult`](crate::AssertionResult)s.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Assertion names a type with no evaluator
    #[error("Unknown assertion type: {0}")]
    UnknownAssertion(String),
}

impl GateError {
    /// Unknown assertion types are flow-definition mistakes
    pub fn is_configuration(&self) -> bool {
        matches!(self, GateError::UnknownAssertion(_))
    }
}
