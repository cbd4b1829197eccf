//! Lifecycle events published while a flow runs

use serde::Serialize;

/// Run lifecycle notification.
///
/// Published on a bounded broadcast bus; a run with no subscribers behaves
/// exactly like one with many.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    Start {
        flow_id: String,
        run_id: String,
        flow_name: String,
        total_steps: usize,
    },
    StepStart {
        flow_id: String,
        run_id: String,
        index: usize,
        name: String,
        url: Option<String>,
    },
    StepComplete {
        flow_id: String,
        run_id: String,
        index: usize,
        name: String,
        passed: bool,
        duration_ms: u64,
    },
    StepError {
        flow_id: String,
        run_id: String,
        index: usize,
        name: String,
        error: String,
    },
    EarlyStop {
        flow_id: String,
        run_id: String,
        index: usize,
        reason: String,
    },
    Complete {
        flow_id: String,
        run_id: String,
        passed: usize,
        failed: usize,
        stopped_early: bool,
        duration_ms: u64,
    },
    Error {
        flow_id: String,
        run_id: Option<String>,
        message: String,
    },
}

impl FlowEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            FlowEvent::Start { .. } => "start",
            FlowEvent::StepStart { .. } => "step_start",
            FlowEvent::StepComplete { .. } => "step_complete",
            FlowEvent::StepError { .. } => "step_error",
            FlowEvent::EarlyStop { .. } => "early_stop",
            FlowEvent::Complete { .. } => "complete",
            FlowEvent::Error { .. } => "error",
        }
    }

    pub fn flow_id(&self) -> &str {
        match self {
            FlowEvent::Start { flow_id, .. }
            | FlowEvent::StepStart { flow_id, .. }
            | FlowEvent::StepComplete { flow_id, .. }
            | FlowEvent::StepError { flow_id, .. }
            | FlowEvent::EarlyStop { flow_id, .. }
            | FlowEvent::Complete { flow_id, .. }
            | FlowEvent::Error { flow_id, .. } => flow_id,
        }
    }
}
