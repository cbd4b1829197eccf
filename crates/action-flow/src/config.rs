//! Runner configuration and per-run options

use flow_variables::Credentials;
use flowrunner_core_types::Viewport;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::FlowError;

pub const DEFAULT_DEVICE: &str = "desktop";
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_ASSERTION_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Engine-wide settings supplied by the configuration provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunnerConfig {
    /// Device profile name to viewport
    pub devices: IndexMap<String, Viewport>,

    /// Profile used when neither the run nor the flow names one
    pub default_device: String,

    /// Navigation and element-wait bound
    pub navigation_timeout_ms: u64,

    /// Presence-wait bound for `visible`/`hidden` assertions
    pub assertion_timeout_ms: u64,

    /// Base URL for relative step URLs
    pub base_url: Option<String>,

    /// Credentials exposed as `${username}` and `${password}`
    pub credentials: Option<Credentials>,

    /// Default fail-fast flag
    pub fail_fast: bool,

    /// Default console-error monitoring flag
    pub console_error_monitoring: bool,

    /// Dependency depth above which validation warns
    pub max_dependency_depth: usize,

    /// Lifecycle event buffer per subscriber
    pub event_capacity: usize,

    /// Global custom variables
    pub variables: HashMap<String, Value>,

    /// Seed for reproducible generated values
    pub generator_seed: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let mut devices = IndexMap::new();
        devices.insert("desktop".to_string(), Viewport::desktop());
        devices.insert("tablet".to_string(), Viewport::tablet());
        devices.insert("mobile".to_string(), Viewport::mobile());
        Self {
            devices,
            default_device: DEFAULT_DEVICE.to_string(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            assertion_timeout_ms: DEFAULT_ASSERTION_TIMEOUT_MS,
            base_url: None,
            credentials: None,
            fail_fast: false,
            console_error_monitoring: true,
            max_dependency_depth: flow_resolver::DEFAULT_MAX_DEPTH,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            variables: HashMap::new(),
            generator_seed: None,
        }
    }
}

impl RunnerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn assertion_timeout(&self) -> Duration {
        Duration::from_millis(self.assertion_timeout_ms)
    }

    /// Viewport for a device profile
    pub fn viewport(&self, device: &str) -> Result<Viewport, FlowError> {
        self.devices.get(device).copied().ok_or_else(|| {
            let known: Vec<&str> = self.devices.keys().map(String::as_str).collect();
            FlowError::Configuration(format!(
                "Unknown device '{}' (known: {})",
                device,
                known.join(", ")
            ))
        })
    }
}

/// Caller-supplied overrides for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Device profile; wins over the flow's own
    pub device: Option<String>,

    /// Fail-fast override
    pub fail_fast: Option<bool>,

    /// Console-error monitoring override
    pub console_error_monitoring: Option<bool>,

    /// Extra custom variables; win over flow and global ones
    pub variables: HashMap<String, Value>,

    /// Generator seed; wins over the configured one
    pub seed: Option<u64>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = Some(enabled);
        self
    }

    pub fn with_console_error_monitoring(mut self, enabled: bool) -> Self {
        self.console_error_monitoring = Some(enabled);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
