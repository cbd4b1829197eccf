//! Core data types for action dispatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One automation operation, decoded from a `{type, ...fields}` descriptor.
///
/// Each variant carries its own field struct so the dispatcher can match on
/// the variant and hand strongly typed arguments to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    /// Navigate the page to a URL
    Navigate(NavigateArgs),

    /// Click an element
    Click(ClickArgs),

    /// Double-click an element
    DoubleClick(SelectorArgs),

    /// Replace the value of a form control
    Fill(FillArgs),

    /// Type text key by key
    Type(TypeArgs),

    /// Press a keyboard key, optionally focused on an element
    Press(PressArgs),

    /// Choose an option of a select element
    Select(SelectArgs),

    /// Tick a checkbox or radio button
    Check(SelectorArgs),

    /// Untick a checkbox
    Uncheck(SelectorArgs),

    /// Move the pointer over an element
    Hover(SelectorArgs),

    /// Focus an element
    Focus(SelectorArgs),

    /// Sleep for a fixed duration
    Wait(WaitArgs),

    /// Wait until an element reaches a state
    WaitForSelector(WaitForSelectorArgs),

    /// Scroll the page or an element
    Scroll(ScrollArgs),

    /// Take a screenshot
    Screenshot(ScreenshotArgs),

    /// Evaluate a script in the page
    Evaluate(EvaluateArgs),

    /// Attach files to a file input
    Upload(UploadArgs),

    /// Artifact capture marker; capture is decided per step, so dispatching
    /// this is a no-op
    Capture(CaptureArgs),
}

impl Action {
    /// Every descriptor `type` the dispatcher understands.
    pub const KINDS: &'static [&'static str] = &[
        "navigate",
        "click",
        "doubleClick",
        "fill",
        "type",
        "press",
        "select",
        "check",
        "uncheck",
        "hover",
        "focus",
        "wait",
        "waitForSelector",
        "scroll",
        "screenshot",
        "evaluate",
        "upload",
        "capture",
    ];

    /// Descriptor `type` of this action
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate(_) => "navigate",
            Action::Click(_) => "click",
            Action::DoubleClick(_) => "doubleClick",
            Action::Fill(_) => "fill",
            Action::Type(_) => "type",
            Action::Press(_) => "press",
            Action::Select(_) => "select",
            Action::Check(_) => "check",
            Action::Uncheck(_) => "uncheck",
            Action::Hover(_) => "hover",
            Action::Focus(_) => "focus",
            Action::Wait(_) => "wait",
            Action::WaitForSelector(_) => "waitForSelector",
            Action::Scroll(_) => "scroll",
            Action::Screenshot(_) => "screenshot",
            Action::Evaluate(_) => "evaluate",
            Action::Upload(_) => "upload",
            Action::Capture(_) => "capture",
        }
    }

    /// Whether `kind` names a known action type
    pub fn is_known_kind(kind: &str) -> bool {
        Self::KINDS.contains(&kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateArgs {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorArgs {
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickArgs {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<MouseButton>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_count: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillArgs {
    pub selector: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeArgs {
    pub selector: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressArgs {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectArgs {
    pub selector: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitArgs {
    pub ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForSelectorArgs {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ElementState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Element state awaited by presence checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    Attached,
    Detached,
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub full_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArgs {
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadArgs {
    pub selector: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Severity of a browser console message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Debug,
    Log,
    Info,
    Warning,
    Error,
}

/// One message observed on the page console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ConsoleMessage {
    pub fn new(level: ConsoleLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            location: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == ConsoleLevel::Error
    }
}

/// Data produced by a dispatched action
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ActionOutput {
    #[default]
    None,

    /// Script evaluation result
    Value(serde_json::Value),

    /// Encoded screenshot image
    Screenshot { name: Option<String>, bytes: Vec<u8> },
}

/// Report for one dispatched action
#[derive(Debug, Clone)]
pub struct ActionReport {
    /// Descriptor type that was dispatched
    pub kind: &'static str,

    /// When the action started
    pub started_at: DateTime<Utc>,

    /// When the action finished
    pub finished_at: DateTime<Utc>,

    /// Total latency in milliseconds
    pub latency_ms: u64,

    /// Output of the driver call
    pub output: ActionOutput,
}

impl ActionReport {
    pub fn new(kind: &'static str, started_at: DateTime<Utc>, output: ActionOutput) -> Self {
        let finished_at = Utc::now();
        let latency_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            kind,
            started_at,
            finished_at,
            latency_ms,
            output,
        }
    }
}
