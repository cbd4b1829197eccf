//! Error types for action dispatch

use thiserror::Error;

/// Errors raised by an automation driver implementation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The driver does not implement the requested operation
    #[error("operation not supported by driver: {0}")]
    Unsupported(String),

    /// A wait or navigation exceeded its deadline
    #[error("timed out: {0}")]
    Timeout(String),

    /// No element matched the selector
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Navigation could not be completed
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Script evaluation raised an exception
    #[error("script error: {0}")]
    Script(String),

    /// Browser session could not be created, used or closed
    #[error("session error: {0}")]
    Session(String),

    /// Anything else reported by the driver
    #[error("{0}")]
    Other(String),
}

/// Errors produced while dispatching an action descriptor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Descriptor names an action type with no handler
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// Descriptor is structurally invalid for its type
    #[error("Invalid '{action}' action: {reason}")]
    InvalidDescriptor { action: String, reason: String },

    /// The driver call failed at runtime
    #[error("Action '{action}' failed: {source}")]
    Failed {
        action: String,
        #[source]
        source: DriverError,
    },
}

impl ActionError {
    /// Whether this error comes from the flow definition rather than the page.
    ///
    /// Configuration errors abort a run; runtime failures are recorded.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ActionError::UnsupportedAction(_) | ActionError::InvalidDescriptor { .. }
        )
    }

    /// Action type the error refers to
    pub fn action(&self) -> &str {
        match self {
            ActionError::UnsupportedAction(action) => action,
            ActionError::InvalidDescriptor { action, .. } => action,
            ActionError::Failed { action, .. } => action,
        }
    }
}
