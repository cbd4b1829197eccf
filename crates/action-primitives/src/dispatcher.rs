//! Action dispatcher
//!
//! Turns an action descriptor into a call against the injected driver:
//! 1. Decode the `{type, ...}` descriptor into a typed [`Action`]
//! 2. Match the variant and pass its fields to the driver operation
//! 3. Wrap driver failures with the action type for context

use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::{
    driver::{AutomationDriver, ClickOptions},
    errors::{ActionError, DriverError},
    types::{Action, ActionOutput, ActionReport},
};

/// Timeout applied to element waits when neither the descriptor nor the
/// caller supplies one
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches actions to an automation driver
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    default_timeout: Duration,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_TIMEOUT)
    }
}

impl ActionDispatcher {
    /// Create a dispatcher whose navigation and element waits default to
    /// `default_timeout`
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Decode a raw descriptor
    pub fn parse(descriptor: &Value) -> Result<Action, ActionError> {
        let kind = descriptor
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ActionError::InvalidDescriptor {
                action: "<untyped>".to_string(),
                reason: "missing string field 'type'".to_string(),
            })?;

        if !Action::is_known_kind(kind) {
            return Err(ActionError::UnsupportedAction(kind.to_string()));
        }

        serde_json::from_value(descriptor.clone()).map_err(|err| ActionError::InvalidDescriptor {
            action: kind.to_string(),
            reason: err.to_string(),
        })
    }

    /// Decode and dispatch a raw descriptor
    pub async fn dispatch_descriptor(
        &self,
        driver: &dyn AutomationDriver,
        descriptor: &Value,
    ) -> Result<ActionReport, ActionError> {
        let action = Self::parse(descriptor)?;
        self.dispatch(driver, &action).await
    }

    /// Dispatch a typed action
    pub async fn dispatch(
        &self,
        driver: &dyn AutomationDriver,
        action: &Action,
    ) -> Result<ActionReport, ActionError> {
        let kind = action.kind();
        let started_at = Utc::now();
        debug!(action = kind, "Dispatching action");

        let budget = self.budget(action);
        let output = match tokio::time::timeout(budget, self.invoke(driver, action)).await {
            Ok(result) => result,
            Err(_) => Err(DriverError::Timeout(format!(
                "{kind} did not finish within {}ms",
                budget.as_millis()
            ))),
        };
        let output = output.map_err(|err| match err {
            DriverError::Unsupported(_) => ActionError::UnsupportedAction(kind.to_string()),
            source => ActionError::Failed {
                action: kind.to_string(),
                source,
            },
        })?;

        Ok(ActionReport::new(kind, started_at, output))
    }

    async fn invoke(
        &self,
        driver: &dyn AutomationDriver,
        action: &Action,
    ) -> Result<ActionOutput, DriverError> {
        match action {
            Action::Navigate(args) => {
                let timeout = self.timeout_or_default(args.timeout_ms);
                driver.navigate(&args.url, timeout).await?;
            }
            Action::Click(args) => {
                let defaults = ClickOptions::default();
                let options = ClickOptions {
                    button: args.button.unwrap_or(defaults.button),
                    click_count: args.click_count.unwrap_or(defaults.click_count),
                };
                driver.click(&args.selector, options).await?;
            }
            Action::DoubleClick(args) => driver.double_click(&args.selector).await?,
            Action::Fill(args) => driver.fill(&args.selector, &args.value).await?,
            Action::Type(args) => {
                let delay = args.delay_ms.map(Duration::from_millis);
                driver.type_text(&args.selector, &args.text, delay).await?;
            }
            Action::Press(args) => driver.press(&args.key, args.selector.as_deref()).await?,
            Action::Select(args) => driver.select_option(&args.selector, &args.value).await?,
            Action::Check(args) => driver.set_checked(&args.selector, true).await?,
            Action::Uncheck(args) => driver.set_checked(&args.selector, false).await?,
            Action::Hover(args) => driver.hover(&args.selector).await?,
            Action::Focus(args) => driver.focus(&args.selector).await?,
            Action::Wait(args) => {
                driver
                    .wait_for_timeout(Duration::from_millis(args.ms))
                    .await?
            }
            Action::WaitForSelector(args) => {
                let timeout = self.timeout_or_default(args.timeout_ms);
                driver
                    .wait_for_selector(&args.selector, args.state.unwrap_or_default(), timeout)
                    .await?;
            }
            Action::Scroll(args) => {
                driver
                    .scroll(args.selector.as_deref(), args.x, args.y)
                    .await?
            }
            Action::Screenshot(args) => {
                let bytes = driver.screenshot(args.full_page).await?;
                return Ok(ActionOutput::Screenshot {
                    name: args.name.clone(),
                    bytes,
                });
            }
            Action::Evaluate(args) => {
                let value = driver.evaluate(&args.script).await?;
                return Ok(ActionOutput::Value(value));
            }
            Action::Upload(args) => driver.upload(&args.selector, &args.files).await?,
            Action::Capture(_) => {
                debug!("capture action is decided by the step capture policy, skipping");
            }
        }
        Ok(ActionOutput::None)
    }

    /// Upper bound on one driver call, whether or not the driver honours
    /// the timeout it is given
    fn budget(&self, action: &Action) -> Duration {
        match action {
            Action::Navigate(args) => self.timeout_or_default(args.timeout_ms),
            Action::WaitForSelector(args) => self.timeout_or_default(args.timeout_ms),
            Action::Wait(args) => Duration::from_millis(args.ms) + self.default_timeout,
            _ => self.default_timeout,
        }
    }

    fn timeout_or_default(&self, timeout_ms: Option<u64>) -> Duration {
        timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout)
    }
}
