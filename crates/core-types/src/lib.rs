use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the engine crates.
#[derive(Debug, Error, Clone)]
pub enum CoreError {
    #[error("{message}")]
    Message { message: String },
}

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identifier of one flow execution.
///
/// Run ids sort chronologically: a UTC timestamp prefix followed by a short
/// random suffix so concurrent runs of the same flow never collide.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RunId(pub String);

impl RunId {
    #[cfg(feature = "serde-full")]
    pub fn new() -> Self {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("run-{stamp}-{}", &suffix[..8]))
    }

    #[cfg(not(feature = "serde-full"))]
    pub fn new() -> Self {
        Self(format!("run-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Browser viewport dimensions for a device profile.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn desktop() -> Self {
        Self::new(1920, 1080)
    }

    pub const fn tablet() -> Self {
        Self::new(768, 1024)
    }

    pub const fn mobile() -> Self {
        Self::new(375, 667)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::desktop()
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique() {
        let a = RunId::new();
        let b = RunId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("run-"));
    }

    #[test]
    fn viewport_display() {
        assert_eq!(Viewport::mobile().to_string(), "375x667");
    }
}
