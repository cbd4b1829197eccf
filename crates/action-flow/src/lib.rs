//! Flow orchestration layer
//!
//! Runs declarative browser test flows through an injected automation
//! driver: dependency flows first, then each step's navigation, actions and
//! assertions, with fail-fast evaluated at step boundaries and every run
//! finalized into a persisted [`RunReport`].

pub mod config;
pub mod errors;
pub mod events;
pub mod executor;
pub mod ports;
pub mod report;
pub mod strategies;
pub mod types;

pub use config::{RunOptions, RunnerConfig};
pub use errors::FlowError;
pub use events::FlowEvent;
pub use executor::{ExecutionContext, FlowRunner};
pub use ports::{DefinitionStore, ReportStore};
pub use report::ReportAssembler;
pub use strategies::{FailFastPolicy, StopDecision};
pub use types::{
    ActionDefinition, Artifact, ArtifactKind, CaptureMode, CapturePolicy, DependencyOutcome,
    FlowDefinition, RunReport, Step, StepResult,
};
