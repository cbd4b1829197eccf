use action_flow::{
    ActionDefinition, ArtifactKind, CaptureMode, CapturePolicy, DefinitionStore, FlowDefinition,
    FlowError, FlowEvent, FlowRunner, ReportStore, RunOptions, RunReport, RunnerConfig, Step,
};
use action_gate::Assertion;
use action_primitives::{
    AutomationDriver, ClickOptions, ConsoleLevel, ConsoleMessage, DriverError, DriverFactory,
    ElementState,
};
use async_trait::async_trait;
use flow_resolver::DependencyMap;
use flowrunner_core_types::Viewport;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Scripted automation driver

#[derive(Default)]
struct Script {
    /// Selectors present on every page
    present: Vec<String>,
    /// Navigation target to the location the page lands on
    redirects: HashMap<String, String>,
    /// Navigation target to a console error logged on load
    console_errors: HashMap<String, String>,
    fail_launch: bool,
    fail_close: bool,
}

#[derive(Default)]
struct Log {
    calls: Vec<String>,
    viewports: Vec<Viewport>,
    closes: usize,
    screenshots: usize,
}

struct MockDriver {
    script: Arc<Script>,
    log: Arc<Mutex<Log>>,
    url: Mutex<String>,
    console: Mutex<Vec<ConsoleMessage>>,
}

impl MockDriver {
    fn record(&self, call: String) {
        self.log.lock().calls.push(call);
    }

    fn present(&self, selector: &str) -> bool {
        self.script.present.iter().any(|s| s == selector)
    }
}

#[async_trait]
impl AutomationDriver for MockDriver {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.record(format!("navigate {url}"));
        let landed = self
            .script
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        *self.url.lock() = landed;
        if let Some(text) = self.script.console_errors.get(url) {
            self.console
                .lock()
                .push(ConsoleMessage::new(ConsoleLevel::Error, text.clone()));
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.url.lock().clone())
    }

    async fn click(&self, selector: &str, _options: ClickOptions) -> Result<(), DriverError> {
        self.record(format!("click {selector}"));
        if self.present(selector) {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(selector.to_string()))
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.record(format!("fill {selector}={value}"));
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: ElementState,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        match (state, self.present(selector)) {
            (ElementState::Visible, true) | (ElementState::Hidden, false) => Ok(()),
            _ => Err(DriverError::Timeout(selector.to_string())),
        }
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>, DriverError> {
        self.log.lock().screenshots += 1;
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn content(&self) -> Result<String, DriverError> {
        Ok("<html><body>ok</body></html>".to_string())
    }

    async fn drain_console(&self) -> Result<Vec<ConsoleMessage>, DriverError> {
        Ok(std::mem::take(&mut *self.console.lock()))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.log.lock().closes += 1;
        if self.script.fail_close {
            return Err(DriverError::Session("browser exited uncleanly".into()));
        }
        Ok(())
    }
}

struct MockFactory {
    script: Arc<Script>,
    log: Arc<Mutex<Log>>,
}

#[async_trait]
impl DriverFactory for MockFactory {
    async fn launch(&self, viewport: Viewport) -> Result<Box<dyn AutomationDriver>, DriverError> {
        if self.script.fail_launch {
            return Err(DriverError::Session("browser binary missing".into()));
        }
        self.log.lock().viewports.push(viewport);
        Ok(Box::new(MockDriver {
            script: Arc::clone(&self.script),
            log: Arc::clone(&self.log),
            url: Mutex::new("about:blank".to_string()),
            console: Mutex::new(Vec::new()),
        }))
    }
}

// ---------------------------------------------------------------------------
// In-memory collaborators

#[derive(Default)]
struct Definitions {
    flows: IndexMap<String, FlowDefinition>,
    actions: IndexMap<String, ActionDefinition>,
}

impl Definitions {
    fn flow(mut self, flow: FlowDefinition) -> Self {
        self.flows.insert(flow.id.clone(), flow);
        self
    }

    fn action(mut self, action: ActionDefinition) -> Self {
        self.actions.insert(action.id.clone(), action);
        self
    }
}

#[async_trait]
impl DefinitionStore for Definitions {
    async fn flow(&self, id: &str) -> Result<FlowDefinition, FlowError> {
        self.flows
            .get(id)
            .cloned()
            .ok_or_else(|| FlowError::flow_not_found(id))
    }

    async fn action(&self, id: &str) -> Result<ActionDefinition, FlowError> {
        self.actions
            .get(id)
            .cloned()
            .ok_or_else(|| FlowError::action_not_found(id))
    }

    async fn flow_ids(&self) -> Result<Vec<String>, FlowError> {
        Ok(self.flows.keys().cloned().collect())
    }

    async fn flow_dependencies(&self) -> Result<DependencyMap, FlowError> {
        Ok(self
            .flows
            .values()
            .map(|flow| (flow.id.clone(), flow.dependencies.clone()))
            .collect())
    }

    async fn action_dependencies(&self) -> Result<DependencyMap, FlowError> {
        Ok(self
            .actions
            .values()
            .map(|action| (action.id.clone(), action.dependencies.clone()))
            .collect())
    }
}

#[derive(Default)]
struct Reports {
    saved: Mutex<Vec<RunReport>>,
    artifacts: Mutex<Vec<String>>,
}

#[async_trait]
impl ReportStore for Reports {
    async fn save(&self, report: &RunReport) -> Result<(), FlowError> {
        self.saved.lock().push(report.clone());
        Ok(())
    }

    async fn load(&self, flow_id: &str, run_id: &str) -> Result<RunReport, FlowError> {
        self.saved
            .lock()
            .iter()
            .find(|r| r.flow_id == flow_id && r.run_id.as_str() == run_id)
            .cloned()
            .ok_or_else(|| FlowError::report_not_found(run_id))
    }

    async fn list(&self, flow_id: &str) -> Result<Vec<RunReport>, FlowError> {
        Ok(self
            .saved
            .lock()
            .iter()
            .rev()
            .filter(|r| r.flow_id == flow_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, flow_id: &str, run_id: &str) -> Result<bool, FlowError> {
        let mut saved = self.saved.lock();
        let before = saved.len();
        saved.retain(|r| !(r.flow_id == flow_id && r.run_id.as_str() == run_id));
        Ok(saved.len() != before)
    }

    async fn artifact_dir(&self, flow_id: &str, run_id: &str) -> Result<String, FlowError> {
        Ok(format!("mem://{flow_id}/{run_id}"))
    }

    async fn save_artifact(
        &self,
        flow_id: &str,
        run_id: &str,
        name: &str,
        _bytes: &[u8],
    ) -> Result<String, FlowError> {
        let location = format!("mem://{flow_id}/{run_id}/{name}");
        self.artifacts.lock().push(location.clone());
        Ok(location)
    }
}

// ---------------------------------------------------------------------------
// Harness

struct Harness {
    runner: FlowRunner,
    reports: Arc<Reports>,
    log: Arc<Mutex<Log>>,
}

fn harness(definitions: Definitions, script: Script) -> Harness {
    let log = Arc::new(Mutex::new(Log::default()));
    let reports = Arc::new(Reports::default());
    let factory = MockFactory {
        script: Arc::new(script),
        log: Arc::clone(&log),
    };
    let config = RunnerConfig {
        assertion_timeout_ms: 10,
        ..Default::default()
    };
    let runner = FlowRunner::new(
        config,
        Arc::new(definitions),
        reports.clone(),
        Arc::new(factory),
    );
    Harness {
        runner,
        reports,
        log,
    }
}

fn site() -> Script {
    Script {
        present: vec!["#ok".to_string(), "#total".to_string()],
        ..Default::default()
    }
}

fn click(selector: &str) -> serde_json::Value {
    json!({ "type": "click", "selector": selector })
}

fn failing_then_passing(fail_fast: Option<bool>) -> FlowDefinition {
    let mut flow = FlowDefinition::new("smoke", "Smoke")
        .with_step(Step::new("S1").with_primitive(click("#missing")))
        .with_step(
            Step::new("S2")
                .with_primitive(click("#ok"))
                .with_assertion(Assertion::new("visible").with_selector("#gone")),
        );
    flow.fail_fast = fail_fast;
    flow
}

// ---------------------------------------------------------------------------
// Fail-fast

#[tokio::test]
async fn fail_fast_stops_after_the_first_failing_step() {
    let h = harness(
        Definitions::default().flow(failing_then_passing(Some(true))),
        site(),
    );

    let report = h.runner.run("smoke", &RunOptions::new()).await.unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.total_steps, 2);
    assert_eq!(report.steps[0].name, "S1");
    assert!(report.stop_reason.as_deref().unwrap().contains("S1"));
    assert_eq!(report.passed + report.failed, report.steps.len());
    assert_eq!(h.reports.saved.lock().len(), 1);
    assert_eq!(h.log.lock().closes, 1);
}

#[tokio::test]
async fn without_fail_fast_every_step_runs() {
    let h = harness(
        Definitions::default().flow(failing_then_passing(None)),
        site(),
    );

    let report = h.runner.run("smoke", &RunOptions::new()).await.unwrap();

    assert!(!report.stopped_early);
    assert!(report.stop_reason.is_none());
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.passed, 0);
    // The failing click does not stop the remaining primitives or assertions
    assert!(!report.steps[1].assertions[0].passed);
}

#[tokio::test]
async fn caller_override_beats_flow_fail_fast() {
    let h = harness(
        Definitions::default().flow(failing_then_passing(Some(true))),
        site(),
    );

    let report = h
        .runner
        .run("smoke", &RunOptions::new().with_fail_fast(false))
        .await
        .unwrap();

    assert_eq!(report.steps.len(), 2);
    assert!(!report.stopped_early);
}

#[tokio::test]
async fn partial_failure_keeps_running_primitives() {
    let flow = FlowDefinition::new("partial", "Partial").with_step(
        Step::new("form")
            .with_primitive(click("#missing"))
            .with_primitive(json!({ "type": "fill", "selector": "#name", "value": "x" })),
    );
    let h = harness(Definitions::default().flow(flow), site());

    let report = h.runner.run("partial", &RunOptions::new()).await.unwrap();

    let step = &report.steps[0];
    assert!(!step.passed);
    assert_eq!(step.errors.len(), 1);
    assert!(h.log.lock().calls.contains(&"fill #name=x".to_string()));
}

// ---------------------------------------------------------------------------
// Capture policy

#[tokio::test]
async fn on_failure_capture_only_for_failing_steps() {
    let flow = FlowDefinition::new("capture", "Capture")
        .with_step(
            Step::new("passes")
                .with_primitive(click("#ok"))
                .with_capture(CapturePolicy::screenshots(CaptureMode::OnFailure)),
        )
        .with_step(
            Step::new("fails")
                .with_primitive(click("#missing"))
                .with_capture(CapturePolicy::screenshots(CaptureMode::OnFailure)),
        );
    let h = harness(Definitions::default().flow(flow), site());

    let report = h.runner.run("capture", &RunOptions::new()).await.unwrap();

    assert!(report.steps[0].artifacts.is_empty());
    assert_eq!(report.steps[1].artifacts.len(), 1);
    assert_eq!(report.steps[1].artifacts[0].kind, ArtifactKind::Screenshot);
    assert_eq!(h.log.lock().screenshots, 1);
}

#[tokio::test]
async fn always_and_never_capture_policies() {
    let flow = FlowDefinition::new("capture", "Capture")
        .with_step(Step::new("always").with_capture(CapturePolicy {
            screenshot: CaptureMode::Always,
            html: CaptureMode::Always,
            full_page: true,
        }))
        .with_step(
            Step::new("never")
                .with_primitive(click("#missing"))
                .with_capture(CapturePolicy::screenshots(CaptureMode::Never)),
        );
    let h = harness(Definitions::default().flow(flow), site());

    let report = h.runner.run("capture", &RunOptions::new()).await.unwrap();

    let kinds: Vec<ArtifactKind> = report.steps[0].artifacts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ArtifactKind::Screenshot, ArtifactKind::Html]);
    assert!(report.steps[1].artifacts.is_empty());
    assert_eq!(h.reports.artifacts.lock().len(), 2);
}

// ---------------------------------------------------------------------------
// Dependencies

#[tokio::test]
async fn shared_dependency_runs_once_in_order() {
    let definitions = Definitions::default()
        .flow(
            FlowDefinition::new("c", "C")
                .with_step(Step::new("c1").with_url("https://app.test/c")),
        )
        .flow(
            FlowDefinition::new("b", "B")
                .with_dependency("c")
                .with_step(Step::new("b1").with_url("https://app.test/b")),
        )
        .flow(
            FlowDefinition::new("a", "A")
                .with_dependency("b")
                .with_dependency("c")
                .with_step(Step::new("a1").with_url("https://app.test/a")),
        );
    let h = harness(definitions, site());

    let report = h.runner.run("a", &RunOptions::new()).await.unwrap();

    let navigations: Vec<String> = h
        .log
        .lock()
        .calls
        .iter()
        .filter(|call| call.starts_with("navigate"))
        .cloned()
        .collect();
    assert_eq!(
        navigations,
        vec![
            "navigate https://app.test/c",
            "navigate https://app.test/b",
            "navigate https://app.test/a",
        ]
    );
    let dependencies: Vec<&str> = report
        .dependencies
        .iter()
        .map(|d| d.flow_id.as_str())
        .collect();
    assert_eq!(dependencies, vec!["c", "b"]);
    assert_eq!(h.reports.saved.lock().len(), 3);
    assert_eq!(h.log.lock().closes, 3);
}

#[tokio::test]
async fn failing_dependency_does_not_block_dependent() {
    let definitions = Definitions::default()
        .flow(FlowDefinition::new("setup", "Setup").with_step(Step::new("s").with_primitive(click("#missing"))))
        .flow(
            FlowDefinition::new("main", "Main")
                .with_dependency("setup")
                .with_step(Step::new("m").with_primitive(click("#ok"))),
        );
    let h = harness(definitions, site());

    let report = h.runner.run("main", &RunOptions::new()).await.unwrap();

    assert!(report.success());
    assert_eq!(report.dependencies.len(), 1);
    assert!(!report.dependencies[0].success());
}

#[tokio::test]
async fn self_dependency_fails_before_any_session() {
    let h = harness(
        Definitions::default().flow(
            FlowDefinition::new("a", "A")
                .with_dependency("a")
                .with_step(Step::new("x")),
        ),
        site(),
    );

    let err = h.runner.run("a", &RunOptions::new()).await.unwrap_err();

    assert!(matches!(err, FlowError::Validation { .. }));
    assert!(err.to_string().contains("cannot depend on itself"));
    assert!(h.log.lock().viewports.is_empty());
    assert!(h.reports.saved.lock().is_empty());
}

#[tokio::test]
async fn cycle_fails_before_any_session() {
    let h = harness(
        Definitions::default()
            .flow(FlowDefinition::new("a", "A").with_dependency("b"))
            .flow(FlowDefinition::new("b", "B").with_dependency("a")),
        site(),
    );

    let err = h.runner.run("a", &RunOptions::new()).await.unwrap_err();

    assert!(err.to_string().contains("Circular dependency detected"));
    assert!(h.log.lock().viewports.is_empty());
    assert!(h.reports.saved.lock().is_empty());
}

#[tokio::test]
async fn missing_dependency_is_a_validation_error() {
    let h = harness(
        Definitions::default().flow(FlowDefinition::new("a", "A").with_dependency("ghost")),
        site(),
    );

    let err = h.runner.run("a", &RunOptions::new()).await.unwrap_err();

    assert!(matches!(err, FlowError::Validation { ref errors, .. } if errors[0].contains("ghost")));
}

#[tokio::test]
async fn transitive_missing_dependency_fails_before_any_session() {
    let definitions = Definitions::default()
        .flow(
            FlowDefinition::new("a", "A")
                .with_dependency("c")
                .with_dependency("b")
                .with_step(Step::new("x")),
        )
        .flow(
            FlowDefinition::new("b", "B")
                .with_dependency("ghost")
                .with_step(Step::new("x")),
        )
        .flow(FlowDefinition::new("c", "C").with_step(Step::new("x")));
    let h = harness(definitions, site());

    let err = tokio_test::assert_err!(h.runner.run("a", &RunOptions::new()).await);

    assert!(matches!(err, FlowError::Validation { ref errors, .. } if errors[0].contains("ghost")));
    assert!(h.log.lock().viewports.is_empty());
    assert!(h.reports.saved.lock().is_empty());
}

// ---------------------------------------------------------------------------
// Configuration and infrastructure errors

#[tokio::test]
async fn unknown_action_type_aborts_but_keeps_a_report() {
    let flow = FlowDefinition::new("bad", "Bad")
        .with_step(Step::new("S1").with_primitive(json!({ "type": "teleport", "to": "mars" })))
        .with_step(Step::new("S2"));
    let h = harness(Definitions::default().flow(flow), site());

    let err = h.runner.run("bad", &RunOptions::new()).await.unwrap_err();

    assert!(matches!(err, FlowError::Configuration(ref msg) if msg.contains("teleport")));
    let saved = h.reports.saved.lock();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].stopped_early);
    assert_eq!(saved[0].steps.len(), 1);
    assert_eq!(saved[0].failed, 1);
    assert!(!saved[0].steps[0].passed);
    assert!(saved[0].steps[0].errors[0].contains("teleport"));
    assert_eq!(h.log.lock().closes, 1);
}

#[tokio::test]
async fn aborted_step_keeps_artifacts_captured_before_the_abort() {
    let flow = FlowDefinition::new("bad", "Bad").with_step(
        Step::new("S1")
            .with_primitive(json!({ "type": "screenshot", "name": "before" }))
            .with_primitive(json!({ "type": "teleport" })),
    );
    let h = harness(Definitions::default().flow(flow), site());

    let err = tokio_test::assert_err!(h.runner.run("bad", &RunOptions::new()).await);

    assert!(matches!(err, FlowError::Configuration(_)));
    let saved = h.reports.saved.lock();
    let step = &saved[0].steps[0];
    assert_eq!(step.artifacts.len(), 1);
    assert_eq!(step.artifacts[0].kind, ArtifactKind::Screenshot);
    assert_eq!(
        h.reports.artifacts.lock().as_slice(),
        &[step.artifacts[0].location.clone()]
    );
}

#[tokio::test]
async fn unknown_assertion_type_aborts() {
    let flow = FlowDefinition::new("bad", "Bad")
        .with_step(Step::new("S1").with_assertion(Assertion::new("sparkles")));
    let h = harness(Definitions::default().flow(flow), site());

    let err = h.runner.run("bad", &RunOptions::new()).await.unwrap_err();

    assert!(matches!(err, FlowError::Configuration(_)));
    assert_eq!(h.log.lock().closes, 1);
}

#[tokio::test]
async fn launch_failure_is_infrastructure_error_without_report() {
    let h = harness(
        Definitions::default().flow(FlowDefinition::new("a", "A").with_step(Step::new("x"))),
        Script {
            fail_launch: true,
            ..site()
        },
    );

    let err = h.runner.run("a", &RunOptions::new()).await.unwrap_err();

    assert!(matches!(err, FlowError::Infrastructure(_)));
    assert!(h.reports.saved.lock().is_empty());
}

#[tokio::test]
async fn close_failure_surfaces_after_the_report_is_saved() {
    let h = harness(
        Definitions::default().flow(FlowDefinition::new("a", "A").with_step(Step::new("x"))),
        Script {
            fail_close: true,
            ..site()
        },
    );
    let mut rx = h.runner.subscribe();

    let err = tokio_test::assert_err!(h.runner.run("a", &RunOptions::new()).await);

    assert!(matches!(err, FlowError::Infrastructure(ref msg) if msg.contains("exited uncleanly")));
    assert_eq!(h.log.lock().closes, 1);
    let saved = h.reports.saved.lock();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].passed, 1);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(!events.iter().any(|e| matches!(e, FlowEvent::Complete { .. })));
    assert!(matches!(events.last(), Some(FlowEvent::Error { .. })));
}

#[tokio::test]
async fn unknown_device_is_rejected() {
    let h = harness(
        Definitions::default().flow(FlowDefinition::new("a", "A")),
        site(),
    );

    let err = h
        .runner
        .run("a", &RunOptions::new().with_device("smartwatch"))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Configuration(_)));
}

#[tokio::test]
async fn device_profile_sizes_the_session() {
    let h = harness(
        Definitions::default().flow(FlowDefinition::new("a", "A").with_step(Step::new("x"))),
        site(),
    );

    let report = h
        .runner
        .run("a", &RunOptions::new().with_device("mobile"))
        .await
        .unwrap();

    assert_eq!(report.device, "mobile");
    assert_eq!(h.log.lock().viewports, vec![Viewport::mobile()]);
}

// ---------------------------------------------------------------------------
// Navigation and console monitoring

#[tokio::test]
async fn expected_url_mismatch_marks_navigation_failed() {
    let mut script = site();
    script.redirects.insert(
        "https://app.test/dashboard".into(),
        "https://app.test/login?next=dashboard".into(),
    );
    let flow = FlowDefinition::new("nav", "Nav")
        .with_fail_fast(true)
        .with_step(
            Step::new("open dashboard")
                .with_url("https://app.test/dashboard")
                .with_expected_url("/dashboard"),
        )
        .with_step(Step::new("never runs"));
    let h = harness(Definitions::default().flow(flow), script);

    let report = h.runner.run("nav", &RunOptions::new()).await.unwrap();

    let step = &report.steps[0];
    assert!(step.navigation_failed);
    assert!(!step.passed);
    assert!(report.stopped_early);
    assert!(report
        .stop_reason
        .as_deref()
        .unwrap()
        .contains("navigation failed"));
}

#[tokio::test]
async fn console_errors_stop_a_passing_step() {
    let mut script = site();
    script
        .console_errors
        .insert("https://app.test/".into(), "TypeError: x is undefined".into());
    let flow = FlowDefinition::new("console", "Console")
        .with_fail_fast(true)
        .with_step(Step::new("home").with_url("https://app.test/"))
        .with_step(Step::new("next"));
    let h = harness(Definitions::default().flow(flow), script);

    let report = h.runner.run("console", &RunOptions::new()).await.unwrap();
    assert!(report.steps[0].passed);
    assert_eq!(report.steps[0].console_errors, 1);
    assert!(report.stopped_early);
    assert!(report.stop_reason.as_deref().unwrap().contains("console error"));

    let report = h
        .runner
        .run(
            "console",
            &RunOptions::new().with_console_error_monitoring(false),
        )
        .await
        .unwrap();
    assert!(!report.stopped_early);
    assert_eq!(report.steps.len(), 2);
}

// ---------------------------------------------------------------------------
// Reusable actions and variables

#[tokio::test]
async fn reusable_actions_expand_with_dependencies_and_variables() {
    let definitions = Definitions::default()
        .action(ActionDefinition::new("cookies").with_primitive(click("#ok")))
        .action(
            ActionDefinition::new("login")
                .with_dependency("cookies")
                .with_variable("user", "bob")
                .with_primitive(json!({ "type": "fill", "selector": "#user", "value": "${user}" })),
        )
        .flow(
            FlowDefinition::new("f", "F")
                .with_step(Step::new("twice").with_action("login").with_action("login")),
        );
    let h = harness(definitions, site());

    let report = h.runner.run("f", &RunOptions::new()).await.unwrap();

    assert!(report.steps[0].passed);
    let calls = h.log.lock().calls.clone();
    assert_eq!(calls, vec!["click #ok", "fill #user=bob", "fill #user=bob"]);
}

#[tokio::test]
async fn missing_reusable_action_fails_the_step_only() {
    let flow = FlowDefinition::new("f", "F").with_step(Step::new("s").with_action("ghost"));
    let h = harness(Definitions::default().flow(flow), site());

    let report = h.runner.run("f", &RunOptions::new()).await.unwrap();

    assert!(!report.steps[0].passed);
    assert!(report.steps[0].errors[0].contains("ghost"));
}

#[tokio::test]
async fn cyclic_reusable_actions_fail_validation() {
    let definitions = Definitions::default()
        .action(ActionDefinition::new("x").with_dependency("y"))
        .action(ActionDefinition::new("y").with_dependency("x"))
        .flow(FlowDefinition::new("f", "F").with_step(Step::new("s").with_action("x")));
    let h = harness(definitions, site());

    let err = h.runner.run("f", &RunOptions::new()).await.unwrap_err();

    assert!(matches!(err, FlowError::Validation { .. }));
    assert!(h.log.lock().viewports.is_empty());
}

#[tokio::test]
async fn urls_and_descriptors_are_interpolated() {
    let flow = FlowDefinition::new("vars", "Vars")
        .with_base_url("https://shop.test")
        .with_step(
            Step::new("product")
                .with_url("/p/${sku}")
                .with_primitive(json!({ "type": "fill", "selector": "#q", "value": "${sku}-${unknown}" })),
        );
    let h = harness(Definitions::default().flow(flow), site());

    let report = h
        .runner
        .run("vars", &RunOptions::new().with_variable("sku", 42))
        .await
        .unwrap();

    assert_eq!(report.steps[0].url.as_deref(), Some("https://shop.test/p/42"));
    let calls = h.log.lock().calls.clone();
    assert_eq!(calls, vec!["navigate https://shop.test/p/42", "fill #q=42-${unknown}"]);
}

// ---------------------------------------------------------------------------
// Lifecycle events

#[tokio::test]
async fn lifecycle_events_are_published_in_order() {
    let flow = FlowDefinition::new("events", "Events")
        .with_fail_fast(true)
        .with_step(Step::new("S1").with_primitive(click("#missing")))
        .with_step(Step::new("S2"));
    let h = harness(Definitions::default().flow(flow), site());
    let mut rx = h.runner.subscribe();

    h.runner.run("events", &RunOptions::new()).await.unwrap();

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    assert_eq!(
        names,
        vec!["start", "step_start", "step_complete", "early_stop", "complete"]
    );
}

#[tokio::test]
async fn runs_without_subscribers() {
    let flow = FlowDefinition::new("quiet", "Quiet").with_step(Step::new("S1"));
    let h = harness(Definitions::default().flow(flow), site());
    assert_eq!(h.runner.event_bus().subscriber_count(), 0);

    let report = h.runner.run("quiet", &RunOptions::new()).await.unwrap();

    assert!(report.success());
    assert!(matches!(
        h.reports.load("quiet", report.run_id.as_str()).await,
        Ok(ref loaded) if loaded == &report
    ));
}

#[tokio::test]
async fn step_error_event_on_configuration_error() {
    let flow = FlowDefinition::new("bad", "Bad")
        .with_step(Step::new("S1").with_primitive(json!({ "type": "teleport" })));
    let h = harness(Definitions::default().flow(flow), site());
    let mut rx = h.runner.subscribe();

    let _ = h.runner.run("bad", &RunOptions::new()).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events
        .iter()
        .any(|e| matches!(e, FlowEvent::StepError { index: 0, .. })));
    assert!(matches!(events.last(), Some(FlowEvent::Error { .. })));
}
