//! Core types for step assertions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::GateError;

/// A declarative check evaluated against the current page
///
/// The record is kept loose (`type` is a plain string) so that flow
/// definitions with an unrecognised type still load; the type is checked
/// when the assertion is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    /// Assertion type (`visible`, `hidden`, `text`, `count`, `value`,
    /// `attribute`, `url`)
    #[serde(rename = "type")]
    pub kind: String,

    /// Target element selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Attribute name for `attribute` assertions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// Expected value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,

    /// Override of the presence-wait timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Assertion {
    /// Create an assertion of `kind` with no fields set
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            selector: None,
            attribute: None,
            expected: None,
            timeout_ms: None,
        }
    }

    /// Set selector
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Set attribute name
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Set expected value
    pub fn with_expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Expected value rendered as text; strings are taken verbatim
    pub fn expected_text(&self) -> Option<String> {
        self.expected.as_ref().map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}

/// Recognised assertion kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssertionKind {
    Visible,
    Hidden,
    Text,
    Count,
    Value,
    Attribute,
    Url,
}

impl AssertionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssertionKind::Visible => "visible",
            AssertionKind::Hidden => "hidden",
            AssertionKind::Text => "text",
            AssertionKind::Count => "count",
            AssertionKind::Value => "value",
            AssertionKind::Attribute => "attribute",
            AssertionKind::Url => "url",
        }
    }
}

impl FromStr for AssertionKind {
    type Err = GateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "visible" => Ok(AssertionKind::Visible),
            "hidden" => Ok(AssertionKind::Hidden),
            "text" => Ok(AssertionKind::Text),
            "count" => Ok(AssertionKind::Count),
            "value" => Ok(AssertionKind::Value),
            "attribute" => Ok(AssertionKind::Attribute),
            "url" => Ok(AssertionKind::Url),
            other => Err(GateError::UnknownAssertion(other.to_string())),
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    /// Assertion type
    #[serde(rename = "type")]
    pub kind: String,

    /// Target selector, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Whether the check held
    pub passed: bool,

    /// Expected value as text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// Observed value as text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,

    /// Failure explanation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Evaluation latency in milliseconds
    pub duration_ms: u64,
}

impl AssertionResult {
    /// Create a passing result
    pub fn pass(assertion: &Assertion, actual: Option<String>) -> Self {
        Self {
            kind: assertion.kind.clone(),
            selector: assertion.selector.clone(),
            passed: true,
            expected: assertion.expected_text(),
            actual,
            message: None,
            duration_ms: 0,
        }
    }

    /// Create a failing result
    pub fn fail(assertion: &Assertion, actual: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind: assertion.kind.clone(),
            selector: assertion.selector.clone(),
            passed: false,
            expected: assertion.expected_text(),
            actual,
            message: Some(message.into()),
            duration_ms: 0,
        }
    }

    /// Set latency
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// One-line description used in stop reasons
    pub fn describe(&self) -> String {
        let target = self
            .selector
            .as_deref()
            .map(|selector| format!(" on '{selector}'"))
            .unwrap_or_default();
        match &self.message {
            Some(message) => format!("{} assertion{}: {}", self.kind, target, message),
            None => format!("{} assertion{}", self.kind, target),
        }
    }
}
