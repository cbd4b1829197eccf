//! Run report assembly

use chrono::{DateTime, Utc};
use flowrunner_core_types::{RunId, Viewport};
use std::time::Instant;

use crate::types::{DependencyOutcome, FlowDefinition, RunReport, StepResult};

/// Accumulates step outcomes into a [`RunReport`]
#[derive(Debug)]
pub struct ReportAssembler {
    flow_id: String,
    flow_name: String,
    run_id: RunId,
    device: String,
    viewport: Viewport,
    total_steps: usize,
    artifact_dir: Option<String>,
    steps: Vec<StepResult>,
    passed: usize,
    failed: usize,
    dependencies: Vec<DependencyOutcome>,
    stop_reason: Option<String>,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl ReportAssembler {
    pub fn new(
        flow: &FlowDefinition,
        run_id: RunId,
        device: impl Into<String>,
        viewport: Viewport,
    ) -> Self {
        Self {
            flow_id: flow.id.clone(),
            flow_name: flow.display_name().to_string(),
            run_id,
            device: device.into(),
            viewport,
            total_steps: flow.steps.len(),
            artifact_dir: None,
            steps: Vec::new(),
            passed: 0,
            failed: 0,
            dependencies: Vec::new(),
            stop_reason: None,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    pub fn with_artifact_dir(mut self, artifact_dir: impl Into<String>) -> Self {
        self.artifact_dir = Some(artifact_dir.into());
        self
    }

    /// Append a finished step and bump the matching counter
    pub fn record_step(&mut self, step: StepResult) {
        if step.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.steps.push(step);
    }

    pub fn record_dependency(&mut self, outcome: DependencyOutcome) {
        self.dependencies.push(outcome);
    }

    /// Mark the run as halted; the first reason given is kept
    pub fn stop_early(&mut self, reason: impl Into<String>) {
        if self.stop_reason.is_none() {
            self.stop_reason = Some(reason.into());
        }
    }

    /// Finalize the report
    pub fn finish(self) -> RunReport {
        let stopped_early = self.stop_reason.is_some() || self.steps.len() < self.total_steps;
        let stop_reason = match (&self.stop_reason, stopped_early) {
            (Some(reason), _) => Some(reason.clone()),
            (None, true) => Some("Run ended before all steps executed".to_string()),
            (None, false) => None,
        };
        RunReport {
            flow_id: self.flow_id,
            flow_name: self.flow_name,
            run_id: self.run_id,
            device: self.device,
            viewport: self.viewport,
            steps: self.steps,
            passed: self.passed,
            failed: self.failed,
            total_steps: self.total_steps,
            stopped_early,
            stop_reason,
            dependencies: self.dependencies,
            artifact_dir: self.artifact_dir,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_ms: self.clock.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Step;

    fn flow(steps: usize) -> FlowDefinition {
        (0..steps).fold(FlowDefinition::new("f", "Flow"), |flow, i| {
            flow.with_step(Step::new(format!("S{}", i + 1)))
        })
    }

    fn step(index: usize, passed: bool) -> StepResult {
        let mut step = StepResult::new(index, format!("S{}", index + 1));
        step.passed = passed;
        step
    }

    #[test]
    fn counts_add_up_to_recorded_steps() {
        let mut assembler = ReportAssembler::new(&flow(3), RunId::new(), "desktop", Viewport::desktop());
        assembler.record_step(step(0, true));
        assembler.record_step(step(1, false));
        assembler.record_step(step(2, true));
        let report = assembler.finish();
        assert_eq!(report.passed + report.failed, report.steps.len());
        assert_eq!(report.total_steps, 3);
        assert!(!report.stopped_early);
        assert!(report.stop_reason.is_none());
        assert!(!report.success());
    }

    #[test]
    fn early_stop_keeps_first_reason() {
        let mut assembler = ReportAssembler::new(&flow(2), RunId::new(), "desktop", Viewport::desktop())
            .with_artifact_dir("/tmp/artifacts");
        assembler.record_step(step(0, false));
        assembler.stop_early("Step 1 'S1' failed");
        assembler.stop_early("later");
        let report = assembler.finish();
        assert!(report.stopped_early);
        assert_eq!(report.stop_reason.as_deref(), Some("Step 1 'S1' failed"));
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.artifact_dir.as_deref(), Some("/tmp/artifacts"));
        assert!(report.summary().contains("stopped early"));
    }

    #[test]
    fn fewer_steps_than_declared_implies_stopped_early() {
        let assembler = ReportAssembler::new(&flow(2), RunId::new(), "mobile", Viewport::mobile());
        let report = assembler.finish();
        assert!(report.stopped_early);
        assert!(report.stop_reason.is_some());
    }

    #[test]
    fn all_passing_steps_succeed() {
        let mut assembler = ReportAssembler::new(&flow(1), RunId::new(), "desktop", Viewport::desktop());
        assembler.record_step(step(0, true));
        let report = assembler.finish();
        assert!(report.success());
        assert!(report.summary().starts_with("PASSED Flow"));
    }
}
