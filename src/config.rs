//! Timing configuration
//!
//! Defaults, then `./.tui-confirm.json` or `./tui-confirm.json` (or an
//! explicit path), then `TUI_CONFIRM_*` environment variables.

use crate::confirm::ConfirmOptions;
use crate::portal::PortalOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Confirmation timing configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
    /// Grace delay between an answer and the dialog's removal
    pub unmount_delay_ms: u64,

    /// How long a dismissed portal descriptor lingers before removal
    pub exit_transition_ms: Option<u64>,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            unmount_delay_ms: 1000,
            exit_transition_ms: None,
        }
    }
}

impl ConfirmConfig {
    /// Initialize configuration from defaults, a config file and the environment
    pub async fn init(path: Option<&Path>) -> Result<Self> {
        debug!("Initializing confirmation configuration");

        let mut config = match path {
            Some(path) => Self::load_from_path(path).await?,
            None => Self::load_from_file().await?.unwrap_or_default(),
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(delay) = var("TUI_CONFIRM_UNMOUNT_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.unmount_delay_ms = delay;
        }

        if let Some(value) = var("TUI_CONFIRM_EXIT_TRANSITION_MS") {
            if value.is_empty() || value == "none" {
                self.exit_transition_ms = None;
            } else if let Ok(transition) = value.parse() {
                self.exit_transition_ms = Some(transition);
            }
        }
    }

    /// Load configuration from the first tui-confirm.json found
    ///
    /// `Ok(None)` when there is no file; a file that fails to parse is an error.
    pub async fn load_from_file() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new(".")).await
    }

    async fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_paths: [PathBuf; 2] = [dir.join(".tui-confirm.json"), dir.join("tui-confirm.json")];

        for path in config_paths {
            if tokio::fs::try_exists(&path).await? {
                return Self::load_from_path(&path).await.map(Some);
            }
        }

        debug!("No configuration file found in {}", dir.display());
        Ok(None)
    }

    pub async fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    pub fn confirm_options(&self) -> ConfirmOptions {
        ConfirmOptions::default().with_unmount_delay(Duration::from_millis(self.unmount_delay_ms))
    }

    pub fn portal_options(&self) -> PortalOptions {
        PortalOptions {
            exit_transition: self.exit_transition_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ConfirmConfig::default();
        assert_eq!(config.confirm_options().unmount_delay, Duration::from_millis(1000));
        assert_eq!(config.portal_options().exit_transition, None);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TUI_CONFIRM_UNMOUNT_DELAY_MS", "250"),
            ("TUI_CONFIRM_EXIT_TRANSITION_MS", "80"),
        ]
        .into_iter()
        .collect();

        let mut config = ConfirmConfig::default();
        config.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.unmount_delay_ms, 250);
        assert_eq!(config.portal_options().exit_transition, Some(Duration::from_millis(80)));
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = ConfirmConfig::default();
        config.apply_env(|name| match name {
            "TUI_CONFIRM_UNMOUNT_DELAY_MS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config, ConfirmConfig::default());
    }

    #[tokio::test]
    async fn test_load_from_path_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tui-confirm.json");
        std::fs::write(&path, r#"{ "exit_transition_ms": 120 }"#).unwrap();

        let config = ConfirmConfig::load_from_path(&path).await.unwrap();
        assert_eq!(config.unmount_delay_ms, 1000);
        assert_eq!(config.exit_transition_ms, Some(120));
    }

    #[tokio::test]
    async fn test_load_from_path_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(ConfirmConfig::load_from_path(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ConfirmConfig::load_from_dir(dir.path()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tui-confirm.json"), r#"{ "unmount_delay_ms": "slow" }"#).unwrap();

        let err = ConfirmConfig::load_from_dir(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("tui-confirm.json"));
    }

    #[tokio::test]
    async fn test_hidden_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".tui-confirm.json"), r#"{ "unmount_delay_ms": 5 }"#).unwrap();
        std::fs::write(dir.path().join("tui-confirm.json"), r#"{ "unmount_delay_ms": 9 }"#).unwrap();

        let config = ConfirmConfig::load_from_dir(dir.path()).await.unwrap().unwrap();
        assert_eq!(config.unmount_delay_ms, 5);
    }
}
