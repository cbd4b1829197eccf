//! Values available to the interpolator

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Stored login credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Configuration-derived and caller-supplied variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableContext {
    pub base_url: Option<String>,
    pub credentials: Option<Credentials>,
    pub custom: HashMap<String, Value>,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(name.into(), value.into());
        self
    }

    /// Overlay `extra` on the custom variables; `extra` wins on conflicts
    pub fn merged(&self, extra: &HashMap<String, Value>) -> Self {
        let mut merged = self.clone();
        for (name, value) in extra {
            merged.custom.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Custom variable rendered as text; strings are taken verbatim
    pub fn custom_text(&self, name: &str) -> Option<String> {
        self.custom.get(name).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }
}
