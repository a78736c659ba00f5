//! Settings file handling.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Usage refresh interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Update check interval in seconds
    #[serde(default = "default_update_check_interval")]
    pub update_check_interval_secs: u64,

    /// Check the release feed for new versions
    #[serde(default = "default_check_updates")]
    pub check_updates: bool,
}

fn default_poll_interval() -> u64 {
    300
}

fn default_update_check_interval() -> u64 {
    14_400
}

fn default_check_updates() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            update_check_interval_secs: default_update_check_interval(),
            check_updates: default_check_updates(),
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file: {:?}", p))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", p));
            }
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("quotamon/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/quotamon/config.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {:?}", path));
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    /// Clamp intervals so a bad config cannot hot-loop the scheduler.
    pub fn validate(&mut self) {
        const MIN_POLL_SECS: u64 = 10;
        const MIN_UPDATE_CHECK_SECS: u64 = 60;

        if self.poll_interval_secs < MIN_POLL_SECS {
            self.poll_interval_secs = MIN_POLL_SECS;
        }
        if self.update_check_interval_secs < MIN_UPDATE_CHECK_SECS {
            self.update_check_interval_secs = MIN_UPDATE_CHECK_SECS;
        }
    }

    /// Usage refresh interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Update check interval.
    pub fn update_check_interval(&self) -> Duration {
        Duration::from_secs(self.update_check_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.poll_interval_secs, 300);
        assert_eq!(settings.update_check_interval_secs, 14_400);
        assert!(settings.check_updates);
    }

    #[test]
    fn parse_toml_with_partial_fields() {
        let toml = r#"
            poll_interval_secs = 120
            check_updates = false
        "#;

        let settings: Settings = toml::from_str(toml).expect("Should parse TOML");
        assert_eq!(settings.poll_interval_secs, 120);
        assert_eq!(settings.update_check_interval_secs, 14_400);
        assert!(!settings.check_updates);
    }

    #[test]
    fn validate_clamps_hot_loops() {
        let mut settings = Settings {
            poll_interval_secs: 0,
            update_check_interval_secs: 1,
            check_updates: true,
        };
        settings.validate();
        assert_eq!(settings.poll_interval_secs, 10);
        assert_eq!(settings.update_check_interval_secs, 60);
    }

    #[test]
    fn explicit_missing_path_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.poll_interval_secs, 300);
    }

    #[test]
    fn explicit_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_secs = 45\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.poll_interval_secs, 45);
    }
}
