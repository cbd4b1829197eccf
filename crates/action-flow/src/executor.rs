//! Flow orchestration
//!
//! A run moves through `Initializing -> Running(step) -> Completed |
//! StoppedEarly -> Finalized`. Dependency flows run first as nested runs,
//! each at most once per top-level run. Steps run strictly in order on one
//! automation session, which is closed on every exit path.

use action_gate::{Assertion, AssertionEvaluator, DefaultAssertionEvaluator};
use action_primitives::{ActionDispatcher, ActionOutput, AutomationDriver, DriverFactory};
use async_recursion::async_recursion;
use flow_resolver::{ordered_dependencies, DependencyMap, DependencyResolver, ItemKind, ResolveError};
use flow_variables::{Interpolator, VariableContext};
use flowrunner_core_types::RunId;
use flowrunner_event_bus::{EventBus, InMemoryBus};
use indexmap::IndexSet;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    config::{RunOptions, RunnerConfig},
    errors::FlowError,
    events::FlowEvent,
    ports::{DefinitionStore, ReportStore},
    report::ReportAssembler,
    strategies::{FailFastPolicy, StopDecision},
    types::{Artifact, ArtifactKind, DependencyOutcome, FlowDefinition, RunReport, Step, StepResult},
};

/// State threaded through one top-level run and its nested dependency runs
#[derive(Debug, Default)]
pub struct ExecutionContext {
    executed: HashSet<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The flow already ran (or is running) in this top-level run
    pub fn has_executed(&self, flow_id: &str) -> bool {
        self.executed.contains(flow_id)
    }

    /// Returns `false` when the flow was already marked
    pub fn mark_executed(&mut self, flow_id: &str) -> bool {
        self.executed.insert(flow_id.to_string())
    }

    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }
}

/// Per-run borrowed state used while steps execute
struct RunScope<'a> {
    flow: &'a FlowDefinition,
    run_id: &'a RunId,
    driver: &'a dyn AutomationDriver,
    interpolator: &'a Interpolator,
}

/// Runs flows against sessions from a [`DriverFactory`]
pub struct FlowRunner {
    config: RunnerConfig,
    definitions: Arc<dyn DefinitionStore>,
    reports: Arc<dyn ReportStore>,
    drivers: Arc<dyn DriverFactory>,
    evaluator: Arc<dyn AssertionEvaluator>,
    resolver: DependencyResolver,
    events: Arc<InMemoryBus<FlowEvent>>,
}

impl FlowRunner {
    /// Create a runner
    pub fn new(
        config: RunnerConfig,
        definitions: Arc<dyn DefinitionStore>,
        reports: Arc<dyn ReportStore>,
        drivers: Arc<dyn DriverFactory>,
    ) -> Self {
        let evaluator = Arc::new(DefaultAssertionEvaluator::new(config.assertion_timeout()));
        let resolver = DependencyResolver::new(config.max_dependency_depth);
        let events = InMemoryBus::new(config.event_capacity);
        Self {
            config,
            definitions,
            reports,
            drivers,
            evaluator,
            resolver,
            events,
        }
    }

    /// Replace the assertion evaluator
    pub fn with_evaluator(mut self, evaluator: Arc<dyn AssertionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Receive lifecycle events of every run started after this call
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> Arc<InMemoryBus<FlowEvent>> {
        Arc::clone(&self.events)
    }

    /// Run a flow and its dependencies
    pub async fn run(&self, flow_id: &str, options: &RunOptions) -> Result<RunReport, FlowError> {
        let (report, context) = self
            .run_in_context(flow_id, options, ExecutionContext::new())
            .await?;
        debug!(
            flow_id,
            flows_executed = context.executed_count(),
            "Top-level run finished"
        );
        Ok(report)
    }

    /// Run a flow, skipping dependencies `context` has already executed.
    ///
    /// The context comes back with every flow run here marked.
    #[async_recursion]
    pub async fn run_in_context(
        &self,
        flow_id: &str,
        options: &RunOptions,
        mut context: ExecutionContext,
    ) -> Result<(RunReport, ExecutionContext), FlowError> {
        let flow = self.definitions.flow(flow_id).await?;
        let mut flow_dependencies = self.definitions.flow_dependencies().await?;
        flow_dependencies.insert(flow.id.clone(), flow.dependencies.clone());

        self.preflight(&flow, &flow_dependencies).await?;

        let order = ordered_dependencies(&flow_dependencies, &flow.id).map_err(|err| {
            FlowError::Validation {
                id: flow.id.clone(),
                errors: vec![err.to_string()],
            }
        })?;
        let pending: Vec<String> = order
            .into_iter()
            .filter(|dependency| !context.has_executed(dependency))
            .collect();

        // The whole closure is checked before any dependency launches a session
        for dependency in &pending {
            let definition = self.definitions.flow(dependency).await?;
            self.preflight(&definition, &flow_dependencies).await?;
        }
        context.mark_executed(&flow.id);

        let mut outcomes = Vec::new();
        for dependency in pending {
            if context.has_executed(&dependency) {
                debug!(flow_id = %flow.id, dependency = %dependency, "Dependency already executed");
                continue;
            }
            info!(flow_id = %flow.id, dependency = %dependency, "Running dependency flow");
            let (report, returned) = self.run_in_context(&dependency, options, context).await?;
            context = returned;
            if !report.success() {
                warn!(
                    flow_id = %flow.id,
                    dependency = %dependency,
                    "Dependency flow did not pass: {}",
                    report.summary()
                );
            }
            outcomes.push(DependencyOutcome::from(&report));
        }

        let report = self.execute(&flow, options, outcomes).await?;
        Ok((report, context))
    }

    /// Reject invalid flow or reusable-action dependencies before any session exists
    async fn preflight(
        &self,
        flow: &FlowDefinition,
        flow_dependencies: &DependencyMap,
    ) -> Result<(), FlowError> {
        let validation =
            self.resolver
                .validate(&flow.id, &flow.dependencies, flow_dependencies, ItemKind::Flow);
        for warning in &validation.warnings {
            warn!(flow_id = %flow.id, "{}", warning);
        }
        if !validation.valid {
            return Err(FlowError::Validation {
                id: flow.id.clone(),
                errors: validation.errors,
            });
        }

        let referenced: IndexSet<&str> = flow
            .steps
            .iter()
            .flat_map(|step| step.actions.iter().map(String::as_str))
            .collect();
        if referenced.is_empty() {
            return Ok(());
        }

        let action_dependencies = self.definitions.action_dependencies().await?;
        let mut errors = Vec::new();
        for action_id in referenced {
            // Missing actions surface as step errors when expanded
            let Some(dependencies) = action_dependencies.get(action_id) else {
                continue;
            };
            let validation = self.resolver.validate(
                action_id,
                dependencies,
                &action_dependencies,
                ItemKind::Action,
            );
            for warning in &validation.warnings {
                warn!(flow_id = %flow.id, action = action_id, "{}", warning);
            }
            errors.extend(validation.errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FlowError::Validation {
                id: flow.id.clone(),
                errors,
            })
        }
    }

    /// Run one flow's steps on a fresh session and persist the report
    async fn execute(
        &self,
        flow: &FlowDefinition,
        options: &RunOptions,
        dependencies: Vec<DependencyOutcome>,
    ) -> Result<RunReport, FlowError> {
        let policy = FailFastPolicy::resolve(&self.config, flow, options);
        let device = options
            .device
            .clone()
            .or_else(|| flow.device.clone())
            .unwrap_or_else(|| self.config.default_device.clone());
        let viewport = self.config.viewport(&device)?;
        let run_id = RunId::new();
        let interpolator = self.interpolator(flow, options);
        let artifact_dir = self
            .reports
            .artifact_dir(&flow.id, run_id.as_str())
            .await?;

        info!(
            flow_id = %flow.id,
            run_id = %run_id,
            device = %device,
            viewport = %viewport,
            fail_fast = policy.enabled,
            "Starting flow run"
        );
        self.emit(FlowEvent::Start {
            flow_id: flow.id.clone(),
            run_id: run_id.to_string(),
            flow_name: flow.display_name().to_string(),
            total_steps: flow.steps.len(),
        })
        .await;

        let driver = match self.drivers.launch(viewport).await {
            Ok(driver) => driver,
            Err(err) => {
                let message = format!("Failed to launch automation session: {err}");
                error!(flow_id = %flow.id, run_id = %run_id, "{}", message);
                self.emit(FlowEvent::Error {
                    flow_id: flow.id.clone(),
                    run_id: Some(run_id.to_string()),
                    message: message.clone(),
                })
                .await;
                return Err(FlowError::Infrastructure(message));
            }
        };

        let mut assembler = ReportAssembler::new(flow, run_id.clone(), &device, viewport)
            .with_artifact_dir(artifact_dir);
        for outcome in dependencies {
            assembler.record_dependency(outcome);
        }

        let scope = RunScope {
            flow,
            run_id: &run_id,
            driver: driver.as_ref(),
            interpolator: &interpolator,
        };
        let outcome = self.run_steps(&scope, &policy, &mut assembler).await;

        let teardown = driver.close().await;
        if let Err(err) = &teardown {
            error!(flow_id = %flow.id, run_id = %run_id, error = %err, "Failed to close automation session");
        }

        if let Err(err) = &outcome {
            assembler.stop_early(format!("Run aborted: {err}"));
        }
        let report = assembler.finish();
        self.reports.save(&report).await?;

        if let Err(err) = outcome {
            self.emit(FlowEvent::Error {
                flow_id: flow.id.clone(),
                run_id: Some(run_id.to_string()),
                message: err.to_string(),
            })
            .await;
            return Err(err);
        }
        if let Err(err) = teardown {
            let message = format!("Failed to close automation session: {err}");
            self.emit(FlowEvent::Error {
                flow_id: flow.id.clone(),
                run_id: Some(run_id.to_string()),
                message: message.clone(),
            })
            .await;
            return Err(FlowError::Infrastructure(message));
        }

        info!(flow_id = %flow.id, run_id = %run_id, "{}", report.summary());
        self.emit(FlowEvent::Complete {
            flow_id: flow.id.clone(),
            run_id: run_id.to_string(),
            passed: report.passed,
            failed: report.failed,
            stopped_early: report.stopped_early,
            duration_ms: report.duration_ms,
        })
        .await;
        Ok(report)
    }

    async fn run_steps(
        &self,
        scope: &RunScope<'_>,
        policy: &FailFastPolicy,
        assembler: &mut ReportAssembler,
    ) -> Result<(), FlowError> {
        let flow_id = scope.flow.id.as_str();
        let run_id = scope.run_id.as_str();

        for (index, step) in scope.flow.steps.iter().enumerate() {
            self.emit(FlowEvent::StepStart {
                flow_id: flow_id.to_string(),
                run_id: run_id.to_string(),
                index,
                name: step.name.clone(),
                url: step.url.clone(),
            })
            .await;

            let clock = Instant::now();
            let mut result = StepResult::new(index, step.name.clone());
            let executed = self.execute_step(scope, step, &mut result).await;
            result.duration_ms = clock.elapsed().as_millis() as u64;

            if let Err(err) = executed {
                error!(flow_id, run_id, step = index, "Step aborted the run: {}", err);
                result.record_error(err.to_string());
                assembler.record_step(result);
                self.emit(FlowEvent::StepError {
                    flow_id: flow_id.to_string(),
                    run_id: run_id.to_string(),
                    index,
                    name: step.name.clone(),
                    error: err.to_string(),
                })
                .await;
                return Err(err);
            }

            if result.passed {
                info!(flow_id, run_id, step = index, "{} passed", result.label());
            } else {
                warn!(flow_id, run_id, step = index, errors = ?result.errors, "{} failed", result.label());
            }
            self.emit(FlowEvent::StepComplete {
                flow_id: flow_id.to_string(),
                run_id: run_id.to_string(),
                index,
                name: step.name.clone(),
                passed: result.passed,
                duration_ms: result.duration_ms,
            })
            .await;

            let decision = policy.decide(&result);
            assembler.record_step(result);
            if let StopDecision::Stop { reason } = decision {
                warn!(flow_id, run_id, step = index, "Stopping early: {}", reason);
                self.emit(FlowEvent::EarlyStop {
                    flow_id: flow_id.to_string(),
                    run_id: run_id.to_string(),
                    index,
                    reason: reason.clone(),
                })
                .await;
                assembler.stop_early(reason);
                break;
            }
        }

        Ok(())
    }

    /// Execute one step into `result`.
    ///
    /// Navigation, action and assertion failures are recorded on the result;
    /// only configuration errors escape, leaving whatever was recorded so far.
    async fn execute_step(
        &self,
        scope: &RunScope<'_>,
        step: &Step,
        result: &mut StepResult,
    ) -> Result<(), FlowError> {
        let timeout = step
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.navigation_timeout());
        let dispatcher = ActionDispatcher::new(timeout);

        if let Some(url) = &step.url {
            self.navigate(scope, step, url, timeout, result).await;
        }

        for descriptor in &step.primitives {
            let descriptor = scope.interpolator.interpolate_value(descriptor);
            self.dispatch(scope, &dispatcher, &descriptor, result)
                .await?;
        }

        if !step.actions.is_empty() {
            self.expand_actions(scope, &dispatcher, step, result)
                .await?;
        }

        for assertion in &step.assertions {
            let assertion = interpolate_assertion(scope.interpolator, assertion);
            let outcome = self.evaluator.evaluate(&assertion, scope.driver).await?;
            result.record_assertion(outcome);
        }

        self.capture(scope, step, result).await;

        match scope.driver.drain_console().await {
            Ok(messages) => result.record_console(messages),
            Err(err) => debug!(error = %err, "Console messages unavailable"),
        }

        Ok(())
    }

    async fn navigate(
        &self,
        scope: &RunScope<'_>,
        step: &Step,
        url: &str,
        timeout: Duration,
        result: &mut StepResult,
    ) {
        let base_url = scope.interpolator.context().base_url.as_deref();
        let url = resolve_url(&scope.interpolator.interpolate_string(url), base_url);
        result.url = Some(url.clone());
        result.navigated = true;
        debug!(url = %url, "Navigating");

        // Drivers may ignore `timeout`
        match tokio::time::timeout(timeout, scope.driver.navigate(&url, timeout)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                result.record_navigation_failure(format!("Navigation to '{url}' failed: {err}"));
                return;
            }
            Err(_) => {
                result.record_navigation_failure(format!(
                    "Navigation to '{url}' did not finish within {}ms",
                    timeout.as_millis()
                ));
                return;
            }
        }

        let Some(expected) = &step.expected_url else {
            return;
        };
        let expected = scope.interpolator.interpolate_string(expected);
        match scope.driver.current_url().await {
            Ok(current) if current.contains(&expected) => {}
            Ok(current) => result.record_navigation_failure(format!(
                "Expected URL containing '{expected}', got '{current}'"
            )),
            Err(err) => {
                result.record_navigation_failure(format!("Could not read current URL: {err}"))
            }
        }
    }

    async fn dispatch(
        &self,
        scope: &RunScope<'_>,
        dispatcher: &ActionDispatcher,
        descriptor: &Value,
        result: &mut StepResult,
    ) -> Result<(), FlowError> {
        match dispatcher.dispatch_descriptor(scope.driver, descriptor).await {
            Ok(report) => {
                if let ActionOutput::Screenshot { name, bytes } = report.output {
                    let name = match name {
                        Some(name) if name.ends_with(".png") => name,
                        Some(name) => format!("{name}.png"),
                        None => format!(
                            "step-{:02}-shot-{}.png",
                            result.index + 1,
                            result.artifacts.len() + 1
                        ),
                    };
                    self.store_artifact(scope, result, ArtifactKind::Screenshot, &name, &bytes)
                        .await;
                }
                Ok(())
            }
            Err(err) if err.is_configuration() => Err(err.into()),
            Err(err) => {
                warn!(action = err.action(), "{}", err);
                result.record_error(err.to_string());
                Ok(())
            }
        }
    }

    /// Expand reusable actions, dependencies first.
    ///
    /// Dependency actions run at most once per step; explicitly listed
    /// actions run every time they are listed.
    async fn expand_actions(
        &self,
        scope: &RunScope<'_>,
        dispatcher: &ActionDispatcher,
        step: &Step,
        result: &mut StepResult,
    ) -> Result<(), FlowError> {
        let action_dependencies = self.definitions.action_dependencies().await?;
        let mut expanded: HashSet<String> = HashSet::new();

        for action_id in &step.actions {
            let dependencies = match ordered_dependencies(&action_dependencies, action_id) {
                Ok(order) => order,
                Err(ResolveError::Unknown { .. }) => Vec::new(),
                Err(err) => {
                    return Err(FlowError::Validation {
                        id: action_id.clone(),
                        errors: vec![err.to_string()],
                    })
                }
            };

            for dependency in dependencies {
                if expanded.insert(dependency.clone()) {
                    self.run_action(scope, dispatcher, &dependency, result)
                        .await?;
                }
            }
            self.run_action(scope, dispatcher, action_id, result)
                .await?;
            expanded.insert(action_id.clone());
        }

        Ok(())
    }

    async fn run_action(
        &self,
        scope: &RunScope<'_>,
        dispatcher: &ActionDispatcher,
        action_id: &str,
        result: &mut StepResult,
    ) -> Result<(), FlowError> {
        let action = match self.definitions.action(action_id).await {
            Ok(action) => action,
            Err(err) if err.is_not_found() => {
                warn!(action = action_id, "Reusable action not found");
                result.record_error(err.to_string());
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        debug!(
            action = action_id,
            primitives = action.primitives.len(),
            "Expanding reusable action"
        );
        let interpolator = scope.interpolator.scoped(&action.variables);
        for descriptor in &action.primitives {
            let descriptor = interpolator.interpolate_value(descriptor);
            self.dispatch(scope, dispatcher, &descriptor, result).await?;
        }
        Ok(())
    }

    /// Capture artifacts according to the step policy and current pass state
    async fn capture(&self, scope: &RunScope<'_>, step: &Step, result: &mut StepResult) {
        let policy = step.capture;
        let step_number = result.index + 1;

        if policy.screenshot.should_capture(result.passed) {
            match scope.driver.screenshot(policy.full_page).await {
                Ok(bytes) => {
                    let name = format!("step-{step_number:02}.png");
                    self.store_artifact(scope, result, ArtifactKind::Screenshot, &name, &bytes)
                        .await;
                }
                Err(err) => warn!(step = result.index, error = %err, "Screenshot capture failed"),
            }
        }

        if policy.html.should_capture(result.passed) {
            match scope.driver.content().await {
                Ok(html) => {
                    let name = format!("step-{step_number:02}.html");
                    self.store_artifact(scope, result, ArtifactKind::Html, &name, html.as_bytes())
                        .await;
                }
                Err(err) => warn!(step = result.index, error = %err, "Markup capture failed"),
            }
        }
    }

    async fn store_artifact(
        &self,
        scope: &RunScope<'_>,
        result: &mut StepResult,
        kind: ArtifactKind,
        name: &str,
        bytes: &[u8],
    ) {
        match self
            .reports
            .save_artifact(&scope.flow.id, scope.run_id.as_str(), name, bytes)
            .await
        {
            Ok(location) => result.artifacts.push(Artifact {
                kind,
                name: name.to_string(),
                location,
            }),
            Err(err) => warn!(artifact = name, error = %err, "Failed to store artifact"),
        }
    }

    fn interpolator(&self, flow: &FlowDefinition, options: &RunOptions) -> Interpolator {
        let mut context = VariableContext::new();
        context.base_url = flow
            .base_url
            .clone()
            .or_else(|| self.config.base_url.clone());
        context.credentials = self.config.credentials.clone();
        context.custom = self.config.variables.clone();
        context.custom.extend(flow.variables.clone());
        context.custom.extend(options.variables.clone());

        match options.seed.or(self.config.generator_seed) {
            Some(seed) => Interpolator::seeded(context, seed),
            None => Interpolator::new(context),
        }
    }

    async fn emit(&self, event: FlowEvent) {
        let name = event.name();
        if let Err(err) = self.events.publish(event).await {
            debug!(event = name, error = %err, "Lifecycle event dropped");
        }
    }
}

fn interpolate_assertion(interpolator: &Interpolator, assertion: &Assertion) -> Assertion {
    let mut resolved = assertion.clone();
    resolved.selector = assertion
        .selector
        .as_deref()
        .map(|selector| interpolator.interpolate_string(selector));
    resolved.attribute = assertion
        .attribute
        .as_deref()
        .map(|attribute| interpolator.interpolate_string(attribute));
    resolved.expected = assertion
        .expected
        .as_ref()
        .map(|expected| interpolator.interpolate_value(expected));
    resolved
}

/// Join a relative step URL onto the base URL
fn resolve_url(url: &str, base_url: Option<&str>) -> String {
    let absolute = url.contains("://") || url.starts_with("about:") || url.starts_with("data:");
    match base_url {
        Some(base) if !absolute => {
            let base = base.trim_end_matches('/');
            if url.starts_with('/') {
                format!("{base}{url}")
            } else {
                format!("{base}/{url}")
            }
        }
        _ => url.to_string(),
    }
}
