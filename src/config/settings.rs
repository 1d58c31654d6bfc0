use super::{default_log_path, ConfigError};
use crate::members::MembershipPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOKEN_ENV: &str = "SLACK_TOKEN";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub slack: SlackSettings,
    #[serde(default)]
    pub default_policy: MembershipPolicy,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlackSettings {
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            api_base: None,
            token_env: default_token_env(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slack.token_env.trim().is_empty() {
            return Err(ConfigError::Settings(
                "slack.token_env must not be empty".to_string(),
            ));
        }
        if let Some(api_base) = &self.slack.api_base {
            let api_base = api_base.trim();
            if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
                return Err(ConfigError::Settings(format!(
                    "slack.api_base `{api_base}` must be an http(s) url"
                )));
            }
        }
        Ok(())
    }

    /// Where reconcile events go, or `None` when logging is disabled.
    pub fn resolve_log_path(&self) -> Result<Option<PathBuf>, ConfigError> {
        if !self.logging.enabled {
            return Ok(None);
        }
        match &self.logging.path {
            Some(path) => Ok(Some(path.clone())),
            None => default_log_path().map(Some),
        }
    }
}
