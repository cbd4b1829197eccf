//! Core types for flow runs

use action_gate::{Assertion, AssertionResult};
use action_primitives::ConsoleMessage;
use chrono::{DateTime, Utc};
use flowrunner_core_types::{RunId, Viewport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Flow definition - an ordered list of steps plus run defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDefinition {
    /// Flow identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Flows that must run before this one
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Base URL for relative step URLs; overrides the configured one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Device profile name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Stop at the first disqualifying step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,

    /// Treat console errors after navigation as disqualifying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_error_monitoring: Option<bool>,

    /// Flow-level custom variables
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, Value>,

    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl FlowDefinition {
    /// Create an empty flow
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            dependencies: Vec::new(),
            base_url: None,
            device: None,
            fail_fast: None,
            console_error_monitoring: None,
            variables: HashMap::new(),
            steps: Vec::new(),
        }
    }

    /// Add step
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Add dependency
    pub fn with_dependency(mut self, flow_id: impl Into<String>) -> Self {
        self.dependencies.push(flow_id.into());
        self
    }

    /// Set fail-fast default
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = Some(enabled);
        self
    }

    /// Set base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Name for reports and logs, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// One stage of a flow
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Step name
    #[serde(default)]
    pub name: String,

    /// URL to navigate to before acting; relative URLs join the base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Substring the location must contain after navigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_url: Option<String>,

    /// Inline action descriptors, `{type, ...fields}`
    #[serde(default)]
    pub primitives: Vec<Value>,

    /// Reusable action ids, expanded in order
    #[serde(default)]
    pub actions: Vec<String>,

    /// Checks evaluated after the actions
    #[serde(default)]
    pub assertions: Vec<Assertion>,

    /// Artifact capture policy
    #[serde(default)]
    pub capture: CapturePolicy,

    /// Bound for navigation and element waits in this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Step {
    /// Create an empty step
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set navigation URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set expected URL substring
    pub fn with_expected_url(mut self, expected: impl Into<String>) -> Self {
        self.expected_url = Some(expected.into());
        self
    }

    /// Add inline action descriptor
    pub fn with_primitive(mut self, descriptor: Value) -> Self {
        self.primitives.push(descriptor);
        self
    }

    /// Add reusable action reference
    pub fn with_action(mut self, action_id: impl Into<String>) -> Self {
        self.actions.push(action_id.into());
        self
    }

    /// Add assertion
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Set capture policy
    pub fn with_capture(mut self, capture: CapturePolicy) -> Self {
        self.capture = capture;
        self
    }
}

/// When an artifact is captured at the end of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMode {
    Always,
    #[default]
    Never,
    OnFailure,
}

impl CaptureMode {
    /// Decide capture from the step's pass state at capture time
    pub fn should_capture(&self, passed: bool) -> bool {
        match self {
            CaptureMode::Always => true,
            CaptureMode::Never => false,
            CaptureMode::OnFailure => !passed,
        }
    }
}

/// Per-step artifact capture settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePolicy {
    /// Screenshot capture
    #[serde(default = "default_screenshot_mode")]
    pub screenshot: CaptureMode,

    /// Page markup capture
    #[serde(default)]
    pub html: CaptureMode,

    /// Capture the full scrollable page instead of the viewport
    #[serde(default)]
    pub full_page: bool,
}

fn default_screenshot_mode() -> CaptureMode {
    CaptureMode::OnFailure
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            screenshot: default_screenshot_mode(),
            html: CaptureMode::Never,
            full_page: false,
        }
    }
}

impl CapturePolicy {
    pub fn screenshots(mode: CaptureMode) -> Self {
        Self {
            screenshot: mode,
            ..Default::default()
        }
    }
}

/// Reusable named action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    /// Action identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Actions expanded before this one
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Variables layered over the run's custom variables while expanding
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, Value>,

    /// Action descriptors, `{type, ...fields}`
    #[serde(default)]
    pub primitives: Vec<Value>,
}

impl ActionDefinition {
    /// Create an empty action
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: None,
            dependencies: Vec::new(),
            variables: HashMap::new(),
            primitives: Vec::new(),
        }
    }

    /// Add descriptor
    pub fn with_primitive(mut self, descriptor: Value) -> Self {
        self.primitives.push(descriptor);
        self
    }

    /// Add dependency
    pub fn with_dependency(mut self, action_id: impl Into<String>) -> Self {
        self.dependencies.push(action_id.into());
        self
    }

    /// Add variable
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

/// Kind of captured artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Screenshot,
    Html,
}

/// Artifact written by the report store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub name: String,
    /// Store-specific location (a file path for the file-system store)
    pub location: String,
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Zero-based position in the flow
    pub index: usize,

    /// Step name
    pub name: String,

    /// Resolved navigation URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Pass flag
    pub passed: bool,

    /// The step navigated
    #[serde(default)]
    pub navigated: bool,

    /// Navigation failed or did not reach the expected URL
    #[serde(default)]
    pub navigation_failed: bool,

    /// Navigation failure explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_error: Option<String>,

    /// Assertion outcomes, in declaration order
    #[serde(default)]
    pub assertions: Vec<AssertionResult>,

    /// Captured artifacts
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// Console messages observed during the step
    #[serde(default)]
    pub console: Vec<ConsoleMessage>,

    /// Number of error-level console messages
    #[serde(default)]
    pub console_errors: usize,

    /// Recorded execution failures
    #[serde(default)]
    pub errors: Vec<String>,

    /// Start time
    pub started_at: DateTime<Utc>,

    /// Latency in milliseconds
    pub duration_ms: u64,
}

impl StepResult {
    /// Create a passing result with nothing recorded yet
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            url: None,
            passed: true,
            navigated: false,
            navigation_failed: false,
            navigation_error: None,
            assertions: Vec::new(),
            artifacts: Vec::new(),
            console: Vec::new(),
            console_errors: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Record an execution failure
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.passed = false;
    }

    /// Record a navigation failure
    pub fn record_navigation_failure(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.navigation_failed = true;
        self.navigation_error = Some(reason.clone());
        self.record_error(reason);
    }

    /// Record an assertion outcome
    pub fn record_assertion(&mut self, result: AssertionResult) {
        if !result.passed {
            self.passed = false;
        }
        self.assertions.push(result);
    }

    /// Record the console messages seen during the step
    pub fn record_console(&mut self, messages: Vec<ConsoleMessage>) {
        self.console_errors += messages.iter().filter(|m| m.is_error()).count();
        self.console.extend(messages);
    }

    /// First failed assertion, if any
    pub fn first_failed_assertion(&self) -> Option<&AssertionResult> {
        self.assertions.iter().find(|a| !a.passed)
    }

    /// Label used in logs and stop reasons
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("Step {}", self.index + 1)
        } else {
            format!("Step {} '{}'", self.index + 1, self.name)
        }
    }
}

/// Summary of a dependency flow run recorded on its dependent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyOutcome {
    pub flow_id: String,
    pub run_id: RunId,
    pub passed: usize,
    pub failed: usize,
    pub stopped_early: bool,
}

impl DependencyOutcome {
    pub fn success(&self) -> bool {
        self.failed == 0 && !self.stopped_early
    }
}

impl From<&RunReport> for DependencyOutcome {
    fn from(report: &RunReport) -> Self {
        Self {
            flow_id: report.flow_id.clone(),
            run_id: report.run_id.clone(),
            passed: report.passed,
            failed: report.failed,
            stopped_early: report.stopped_early,
        }
    }
}

/// Finalized record of one flow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Flow identifier
    pub flow_id: String,

    /// Flow display name
    pub flow_name: String,

    /// Run identifier
    pub run_id: RunId,

    /// Device profile name
    pub device: String,

    /// Viewport of the automation session
    pub viewport: Viewport,

    /// Step outcomes, in execution order
    pub steps: Vec<StepResult>,

    /// Passed step count
    pub passed: usize,

    /// Failed step count
    pub failed: usize,

    /// Steps declared by the flow
    pub total_steps: usize,

    /// The run halted before every step ran
    pub stopped_early: bool,

    /// Why the run halted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    /// Dependency flows run first
    #[serde(default)]
    pub dependencies: Vec<DependencyOutcome>,

    /// Where artifacts of this run are stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<String>,

    /// Start time
    pub started_at: DateTime<Utc>,

    /// Finish time
    pub finished_at: DateTime<Utc>,

    /// Total latency in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    /// Every declared step ran and passed
    pub fn success(&self) -> bool {
        !self.stopped_early && self.failed == 0 && self.steps.len() == self.total_steps
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        let status = if self.success() { "PASSED" } else { "FAILED" };
        let mut line = format!(
            "{} {} ({}): {}/{} steps passed, {} failed in {}ms",
            status,
            self.flow_name,
            self.run_id,
            self.passed,
            self.total_steps,
            self.failed,
            self.duration_ms
        );
        if let Some(reason) = &self.stop_reason {
            line.push_str(&format!(" - stopped early: {reason}"));
        }
        line
    }
}
