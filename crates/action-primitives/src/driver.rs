//! Automation driver capability
//!
//! The engine never automates a browser itself. It talks to an injected
//! [`AutomationDriver`] exposing one operation per action type plus the
//! read-only queries assertions need. Operations a driver does not implement
//! fall back to [`DriverError::Unsupported`], which the dispatcher surfaces as
//! an unsupported action.

use async_trait::async_trait;
use flowrunner_core_types::Viewport;
use std::time::Duration;

use crate::{
    errors::DriverError,
    types::{ConsoleMessage, ElementState, MouseButton},
};

fn unsupported<T>(operation: &str) -> Result<T, DriverError> {
    Err(DriverError::Unsupported(operation.to_string()))
}

/// Options for pointer clicks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOptions {
    pub button: MouseButton,
    pub click_count: u32,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            button: MouseButton::Left,
            click_count: 1,
        }
    }
}

/// One isolated browser session
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Navigate to `url`, waiting for the load to settle or `timeout`
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Location of the current page
    async fn current_url(&self) -> Result<String, DriverError>;

    async fn click(&self, selector: &str, options: ClickOptions) -> Result<(), DriverError> {
        let _ = (selector, options);
        unsupported("click")
    }

    async fn double_click(&self, selector: &str) -> Result<(), DriverError> {
        let _ = selector;
        unsupported("doubleClick")
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        let _ = (selector, value);
        unsupported("fill")
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        delay: Option<Duration>,
    ) -> Result<(), DriverError> {
        let _ = (selector, text, delay);
        unsupported("type")
    }

    async fn press(&self, key: &str, selector: Option<&str>) -> Result<(), DriverError> {
        let _ = (key, selector);
        unsupported("press")
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        let _ = (selector, value);
        unsupported("select")
    }

    async fn set_checked(&self, selector: &str, checked: bool) -> Result<(), DriverError> {
        let _ = (selector, checked);
        unsupported(if checked { "check" } else { "uncheck" })
    }

    async fn hover(&self, selector: &str) -> Result<(), DriverError> {
        let _ = selector;
        unsupported("hover")
    }

    async fn focus(&self, selector: &str) -> Result<(), DriverError> {
        let _ = selector;
        unsupported("focus")
    }

    /// Explicit timed wait
    async fn wait_for_timeout(&self, duration: Duration) -> Result<(), DriverError> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    /// Wait until an element matching `selector` reaches `state`
    async fn wait_for_selector(
        &self,
        selector: &str,
        state: ElementState,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let _ = (selector, state, timeout);
        unsupported("waitForSelector")
    }

    /// Scroll an element into view, or the window by (`x`, `y`)
    async fn scroll(&self, selector: Option<&str>, x: i64, y: i64) -> Result<(), DriverError> {
        let _ = (selector, x, y);
        unsupported("scroll")
    }

    /// Encoded PNG screenshot of the viewport or the full page
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, DriverError> {
        let _ = full_page;
        unsupported("screenshot")
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, DriverError> {
        let _ = script;
        unsupported("evaluate")
    }

    async fn upload(&self, selector: &str, files: &[String]) -> Result<(), DriverError> {
        let _ = (selector, files);
        unsupported("upload")
    }

    /// Full page markup
    async fn content(&self) -> Result<String, DriverError> {
        unsupported("content")
    }

    /// Text content of the first match, `None` when nothing matches
    async fn element_text(&self, selector: &str) -> Result<Option<String>, DriverError> {
        let _ = selector;
        unsupported("elementText")
    }

    /// Number of elements matching `selector`
    async fn element_count(&self, selector: &str) -> Result<usize, DriverError> {
        let _ = selector;
        unsupported("elementCount")
    }

    /// Value of the first matching form control
    async fn input_value(&self, selector: &str) -> Result<Option<String>, DriverError> {
        let _ = selector;
        unsupported("inputValue")
    }

    /// Named attribute of the first match
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, DriverError> {
        let _ = (selector, name);
        unsupported("attribute")
    }

    /// Console messages observed since the previous call
    async fn drain_console(&self) -> Result<Vec<ConsoleMessage>, DriverError> {
        Ok(Vec::new())
    }

    /// Tear the session down
    async fn close(&self) -> Result<(), DriverError>;
}

/// Creates isolated automation sessions
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Launch a session sized to `viewport`
    async fn launch(&self, viewport: Viewport) -> Result<Box<dyn AutomationDriver>, DriverError>;
}
