//! Flow run error types

use thiserror::Error;

/// Errors that abort a flow run.
///
/// Action, navigation and assertion failures are not errors: they are
/// recorded on the step result and only end the run through fail-fast.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Dependency validation failed; raised before any session exists
    #[error("Dependency validation failed for '{id}': {}", errors.join("; "))]
    Validation { id: String, errors: Vec<String> },

    /// Unknown action or assertion type, or an unusable run setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Automation session could not be created or torn down
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    /// Definition or report does not exist
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Definition or report store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    pub fn flow_not_found(id: impl Into<String>) -> Self {
        FlowError::NotFound {
            kind: "Flow",
            id: id.into(),
        }
    }

    pub fn action_not_found(id: impl Into<String>) -> Self {
        FlowError::NotFound {
            kind: "Action",
            id: id.into(),
        }
    }

    pub fn report_not_found(id: impl Into<String>) -> Self {
        FlowError::NotFound {
            kind: "Report",
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FlowError::NotFound { .. })
    }
}

impl From<action_primitives::ActionError> for FlowError {
    fn from(err: action_primitives::ActionError) -> Self {
        FlowError::Configuration(err.to_string())
    }
}

impl From<action_gate::GateError> for FlowError {
    fn from(err: action_gate::GateError) -> Self {
        FlowError::Configuration(err.to_string())
    }
}

impl From<action_primitives::DriverError> for FlowError {
    fn from(err: action_primitives::DriverError) -> Self {
        FlowError::Infrastructure(err.to_string())
    }
}
