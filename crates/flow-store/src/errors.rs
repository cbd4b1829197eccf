use std::io;

use action_flow::FlowError;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum StoreErrKind {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("io failure: {0}")]
    IoFailed(String),
    #[error("corrupt file {path}: {reason}")]
    Corrupt { path: String, reason: String },
    #[error("unsupported definition format: {0}")]
    UnsupportedFormat(String),
    #[error("duplicate {kind} id '{id}'")]
    Duplicate { kind: &'static str, id: String },
}

#[derive(Clone, Debug, Error)]
#[error(transparent)]
pub struct StoreError(pub StoreErrKind);

impl StoreError {
    pub fn new(kind: StoreErrKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &StoreErrKind {
        &self.0
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self(StoreErrKind::NotFound {
            kind,
            id: id.into(),
        })
    }

    pub fn corrupt(path: impl Into<String>, reason: impl ToString) -> Self {
        Self(StoreErrKind::Corrupt {
            path: path.into(),
            reason: reason.to_string(),
        })
    }
}

impl From<StoreErrKind> for StoreError {
    fn from(kind: StoreErrKind) -> Self {
        StoreError(kind)
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError(StoreErrKind::IoFailed(err.to_string()))
    }
}

impl From<StoreError> for FlowError {
    fn from(value: StoreError) -> Self {
        match value.0 {
            StoreErrKind::NotFound { kind, id } => FlowError::NotFound { kind, id },
            other => FlowError::Store(other.to_string()),
        }
    }
}
