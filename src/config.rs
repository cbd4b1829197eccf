//! Application settings
//!
//! Loaded from YAML, then overridden from `FLOWRUN_*` environment variables.

use action_flow::RunnerConfig;
use anyhow::{Context, Result};
use flow_variables::Credentials;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

pub const ENV_BASE_URL: &str = "FLOWRUN_BASE_URL";
pub const ENV_USERNAME: &str = "FLOWRUN_USERNAME";
pub const ENV_PASSWORD: &str = "FLOWRUN_PASSWORD";
pub const ENV_FAIL_FAST: &str = "FLOWRUN_FAIL_FAST";
pub const ENV_DATA_DIR: &str = "FLOWRUN_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Holds `definitions/` and `reports/`
    pub data_dir: PathBuf,

    pub runner: RunnerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            runner: RunnerConfig::default(),
        }
    }
}

impl Settings {
    /// Flow and action definitions: `<data_dir>/definitions/{flows,actions}`
    pub fn definitions_dir(&self) -> PathBuf {
        self.data_dir.join("definitions")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    /// Read settings from `path` (or the default location) and apply
    /// environment overrides. A missing file yields defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_config_path().context("Failed to get config directory")?,
        };

        let mut settings = if path.exists() {
            let content = fs::read_to_string(&path)
                .await
                .context("Failed to read config file")?;
            let settings: Settings =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;
            info!("Loaded configuration from: {}", path.display());
            settings
        } else {
            warn!("Config file not found, using defaults: {}", path.display());
            Settings::default()
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            self.runner.base_url = Some(base_url);
        }

        let username = std::env::var(ENV_USERNAME).ok();
        let password = std::env::var(ENV_PASSWORD).ok();
        if username.is_some() || password.is_some() {
            let credentials = self.runner.credentials.get_or_insert_with(Credentials::default);
            if let Some(username) = username {
                credentials.username = username;
            }
            if let Some(password) = password {
                credentials.password = password;
            }
        }

        if let Ok(raw) = std::env::var(ENV_FAIL_FAST) {
            match parse_flag(&raw) {
                Some(enabled) => self.runner.fail_fast = enabled,
                None => warn!("Ignoring {}={:?}: expected a boolean", ENV_FAIL_FAST, raw),
            }
        }

        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("flowrunner");
    path.push("config.yaml");
    Some(path)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("flowrunner"))
        .unwrap_or_else(|| PathBuf::from(".flowrunner"))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
