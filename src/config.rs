use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration loaded from file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlerterConfig {
    /// Defaults applied when a flag is not given
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Delivery ledger location
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Fallback values for notification flags
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Notification title
    #[serde(default)]
    pub title: Option<String>,

    /// Sender identity
    #[serde(default)]
    pub sender: Option<String>,

    /// Sound name ("default" for the system sound)
    #[serde(default)]
    pub sound: Option<String>,

    /// Auto-close timeout in seconds (0 = never)
    #[serde(default)]
    pub timeout: u64,

    /// Emit JSON instead of tokens
    #[serde(default)]
    pub json: bool,
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerConfig {
    /// Override for the ledger file path
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AlerterConfig {
    /// Load configuration from default path (~/.config/alerter/config.toml)
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Get the default configuration path
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new().map_or_else(
            || PathBuf::from("~/.config/alerter/config.toml"),
            |dirs| dirs.config_dir().join("alerter").join("config.toml"),
        )
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Ledger path, falling back to the cache directory
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger
            .path
            .clone()
            .unwrap_or_else(crate::service::ledger::default_path)
    }

    /// Generate example configuration file content
    #[allow(dead_code)]
    pub fn example() -> String {
        r#"# Alerter Configuration
# Place this file at ~/.config/alerter/config.toml

[defaults]
# Title used when -title is not given
title = "Terminal"

# Sender identity (application name shown by the notification server)
sender = "com.apple.Terminal"

# Sound: "default" for the system sound, a sound name, or empty for silence
sound = ""

# Auto-close after N seconds (0 = wait forever)
timeout = 0

# Print JSON instead of @EVENT tokens
json = false

[ledger]
# Where delivered notifications are recorded for -list/-remove
# path = "/home/me/.cache/alerter/delivered.json"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AlerterConfig::load_from_path(dir.path().join("nope.toml"));
        assert!(config.defaults.title.is_none());
        assert_eq!(config.defaults.timeout, 0);
        assert!(!config.defaults.json);
    }

    #[test]
    fn test_example_parses() {
        let config: AlerterConfig = toml::from_str(&AlerterConfig::example()).unwrap();
        assert_eq!(config.defaults.title.as_deref(), Some("Terminal"));
        assert_eq!(config.defaults.sender.as_deref(), Some("com.apple.Terminal"));
        assert!(config.ledger.path.is_none());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\ntimeout = 30\nsound = \"default\"\n").unwrap();

        let config = AlerterConfig::load_from_path(path);
        assert_eq!(config.defaults.timeout, 30);
        assert_eq!(config.defaults.sound.as_deref(), Some("default"));
        assert!(config.defaults.sender.is_none());
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let config = AlerterConfig::load_from_path(path);
        assert_eq!(config.defaults.timeout, 0);
    }

    #[test]
    fn test_ledger_override() {
        let config: AlerterConfig = toml::from_str("[ledger]\npath = \"/tmp/x.json\"\n").unwrap();
        assert_eq!(config.ledger_path(), PathBuf::from("/tmp/x.json"));
    }
}
