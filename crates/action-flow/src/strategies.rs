//! Fail-fast strategy evaluated at step boundaries

use crate::config::{RunOptions, RunnerConfig};
use crate::types::{FlowDefinition, StepResult};

/// Effective fail-fast settings for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailFastPolicy {
    /// Stop at the first disqualifying step
    pub enabled: bool,

    /// A passing step that navigated and logged console errors disqualifies
    pub console_error_monitoring: bool,
}

impl FailFastPolicy {
    pub fn new(enabled: bool, console_error_monitoring: bool) -> Self {
        Self {
            enabled,
            console_error_monitoring,
        }
    }

    /// Caller override, then the flow's own flag, then the configured default
    pub fn resolve(config: &RunnerConfig, flow: &FlowDefinition, options: &RunOptions) -> Self {
        Self {
            enabled: options
                .fail_fast
                .or(flow.fail_fast)
                .unwrap_or(config.fail_fast),
            console_error_monitoring: options
                .console_error_monitoring
                .or(flow.console_error_monitoring)
                .unwrap_or(config.console_error_monitoring),
        }
    }

    /// Decide whether the run continues after `step`
    pub fn decide(&self, step: &StepResult) -> StopDecision {
        if !self.enabled {
            return StopDecision::Continue;
        }

        let label = step.label();
        if !step.passed {
            let reason = if step.navigation_failed {
                let detail = step
                    .navigation_error
                    .as_deref()
                    .unwrap_or("expected URL not reached");
                format!("{label} navigation failed: {detail}")
            } else if let Some(error) = step.errors.first() {
                format!("{label} failed: {error}")
            } else if let Some(assertion) = step.first_failed_assertion() {
                format!("{label} failed: {}", assertion.describe())
            } else {
                format!("{label} failed")
            };
            return StopDecision::Stop { reason };
        }

        if self.console_error_monitoring && step.navigated && step.console_errors > 0 {
            return StopDecision::Stop {
                reason: format!(
                    "{label} logged {} console error(s) after navigation",
                    step.console_errors
                ),
            };
        }

        StopDecision::Continue
    }
}

/// Outcome of the fail-fast check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopDecision {
    /// Run the next step
    Continue,

    /// End the run here
    Stop { reason: String },
}

impl StopDecision {
    pub fn should_stop(&self) -> bool {
        matches!(self, StopDecision::Stop { .. })
    }
}
