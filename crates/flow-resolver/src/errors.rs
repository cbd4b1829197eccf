//! Resolver error types

use thiserror::Error;

/// Dependency resolution errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The graph contains a cycle; `remaining` lists the nodes that never
    /// became ready
    #[error("Circular dependency among: {}", remaining.join(", "))]
    Cycle { remaining: Vec<String> },

    /// An id was not present in the dependency map
    #[error("Unknown {kind} '{id}'")]
    Unknown { kind: String, id: String },
}
