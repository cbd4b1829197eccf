//! Assertion evaluation against an automation driver

use action_primitives::{AutomationDriver, DriverError, ElementState};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::{
    errors::GateError,
    types::{Assertion, AssertionKind, AssertionResult},
};

/// Bounded wait for `visible`/`hidden` checks
pub const DEFAULT_PRESENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Assertion evaluator trait
#[async_trait]
pub trait AssertionEvaluator: Send + Sync {
    /// Evaluate one assertion.
    ///
    /// Mismatches and driver failures produce a failed result; only an
    /// unrecognised assertion type is an error.
    async fn evaluate(
        &self,
        assertion: &Assertion,
        driver: &dyn AutomationDriver,
    ) -> Result<AssertionResult, GateError>;
}

/// Default evaluator: exact matching, no retries
#[derive(Debug, Clone)]
pub struct DefaultAssertionEvaluator {
    presence_timeout: Duration,
}

impl Default for DefaultAssertionEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_PRESENCE_TIMEOUT)
    }
}

impl DefaultAssertionEvaluator {
    /// Create an evaluator with the given presence-wait bound
    pub fn new(presence_timeout: Duration) -> Self {
        Self { presence_timeout }
    }
}

#[async_trait]
impl AssertionEvaluator for DefaultAssertionEvaluator {
    async fn evaluate(
        &self,
        assertion: &Assertion,
        driver: &dyn AutomationDriver,
    ) -> Result<AssertionResult, GateError> {
        let kind: AssertionKind = assertion.kind.parse()?;
        let start = Instant::now();

        let result = match kind {
            AssertionKind::Visible => {
                self.presence(assertion, driver, ElementState::Visible)
                    .await
            }
            AssertionKind::Hidden => self.presence(assertion, driver, ElementState::Hidden).await,
            AssertionKind::Text => match require_selector(assertion) {
                Ok(selector) => {
                    let observed = driver.element_text(selector).await;
                    compare_optional(assertion, observed, "element not found")
                }
                Err(result) => result,
            },
            AssertionKind::Value => match require_selector(assertion) {
                Ok(selector) => {
                    let observed = driver.input_value(selector).await;
                    compare_optional(assertion, observed, "form control not found")
                }
                Err(result) => result,
            },
            AssertionKind::Attribute => match require_selector(assertion) {
                Ok(selector) => match assertion.attribute.as_deref() {
                    Some(name) => {
                        let observed = driver.attribute(selector, name).await;
                        compare_optional(assertion, observed, "attribute not present")
                    }
                    None => AssertionResult::fail(assertion, None, "missing 'attribute' field"),
                },
                Err(result) => result,
            },
            AssertionKind::Count => match require_selector(assertion) {
                Ok(selector) => self.count(assertion, driver, selector).await,
                Err(result) => result,
            },
            AssertionKind::Url => self.url(assertion, driver).await,
        };

        let result = result.with_duration(start.elapsed().as_millis() as u64);
        if result.passed {
            debug!(kind = %kind, "Assertion passed");
        } else {
            warn!(kind = %kind, "Assertion failed: {}", result.describe());
        }
        Ok(result)
    }
}

impl DefaultAssertionEvaluator {
    async fn presence(
        &self,
        assertion: &Assertion,
        driver: &dyn AutomationDriver,
        state: ElementState,
    ) -> AssertionResult {
        let selector = match require_selector(assertion) {
            Ok(selector) => selector,
            Err(result) => return result,
        };
        let timeout = assertion
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.presence_timeout);

        // Drivers may ignore `timeout`
        let waited =
            tokio::time::timeout(timeout, driver.wait_for_selector(selector, state, timeout)).await;
        match waited {
            Ok(Ok(())) => AssertionResult::pass(assertion, None),
            Ok(Err(err)) => AssertionResult::fail(
                assertion,
                None,
                format!("element did not become {}: {}", state_name(state), err),
            ),
            Err(_) => AssertionResult::fail(
                assertion,
                None,
                format!(
                    "element did not become {} within {}ms",
                    state_name(state),
                    timeout.as_millis()
                ),
            ),
        }
    }

    async fn count(
        &self,
        assertion: &Assertion,
        driver: &dyn AutomationDriver,
        selector: &str,
    ) -> AssertionResult {
        let expected = match assertion.expected_text().map(|text| text.trim().parse::<usize>()) {
            Some(Ok(expected)) => expected,
            Some(Err(_)) | None => {
                return AssertionResult::fail(
                    assertion,
                    None,
                    "expected value is not a non-negative integer",
                )
            }
        };

        match driver.element_count(selector).await {
            Ok(actual) if actual == expected => {
                AssertionResult::pass(assertion, Some(actual.to_string()))
            }
            Ok(actual) => AssertionResult::fail(
                assertion,
                Some(actual.to_string()),
                format!("expected {expected} elements, found {actual}"),
            ),
            Err(err) => AssertionResult::fail(assertion, None, err.to_string()),
        }
    }

    async fn url(&self, assertion: &Assertion, driver: &dyn AutomationDriver) -> AssertionResult {
        let Some(expected) = assertion.expected_text() else {
            return AssertionResult::fail(assertion, None, "missing 'expected' field");
        };

        match driver.current_url().await {
            Ok(current) if current.contains(&expected) => {
                AssertionResult::pass(assertion, Some(current))
            }
            Ok(current) => {
                let message = format!("expected URL to contain '{expected}', got '{current}'");
                AssertionResult::fail(assertion, Some(current), message)
            }
            Err(err) => AssertionResult::fail(assertion, None, err.to_string()),
        }
    }
}

fn require_selector(assertion: &Assertion) -> Result<&str, AssertionResult> {
    assertion
        .selector
        .as_deref()
        .ok_or_else(|| AssertionResult::fail(assertion, None, "missing 'selector' field"))
}

/// Exact comparison of an optional observed value against `expected`
fn compare_optional(
    assertion: &Assertion,
    observed: Result<Option<String>, DriverError>,
    absent: &str,
) -> AssertionResult {
    let expected = assertion.expected_text().unwrap_or_default();
    match observed {
        Ok(Some(actual)) if actual == expected => AssertionResult::pass(assertion, Some(actual)),
        Ok(Some(actual)) => {
            let message = format!("expected '{expected}', got '{actual}'");
            AssertionResult::fail(assertion, Some(actual), message)
        }
        Ok(None) => AssertionResult::fail(assertion, None, absent),
        Err(err) => AssertionResult::fail(assertion, None, err.to_string()),
    }
}

fn state_name(state: ElementState) -> &'static str {
    match state {
        ElementState::Attached => "attached",
        ElementState::Detached => "detached",
        ElementState::Visible => "visible",
        ElementState::Hidden => "hidden",
    }
}
