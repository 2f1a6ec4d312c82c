//! Daemon configuration management
//!
//! Everything has a default; a config file is optional and CLI flags win
//! over file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub daemon: DaemonSettings,
    #[serde(default)]
    pub monitor: MonitorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Explicit path to the usbip executable; PATH is searched when unset
    #[serde(default)]
    pub usbip_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Seconds between poll cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Seconds to wait after an attach request before re-checking the port
    /// listing
    #[serde(default = "default_attach_grace")]
    pub attach_grace_secs: u64,
    /// Hard timeout for each usbip invocation
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_attach_grace() -> u64 {
    2
}

fn default_command_timeout() -> u64 {
    30
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            usbip_path: None,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            attach_grace_secs: default_attach_grace(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            daemon: DaemonSettings::default(),
            monitor: MonitorSettings::default(),
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn attach_grace(&self) -> Duration {
        Duration::from_secs(self.attach_grace_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl DaemonConfig {
    /// Load configuration from the specified path, or from the standard
    /// locations when no path is given
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usbip-auto-attach/config.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: DaemonConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or fall back to defaults if no file exists
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                // Logging may not be initialized yet
                eprintln!("Using default configuration ({:#})", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the given path, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Default user config path: `~/.config/usbip-auto-attach/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("usbip-auto-attach")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval_secs == 0 {
            return Err(anyhow!("monitor.poll_interval_secs must be at least 1"));
        }
        if self.monitor.command_timeout_secs == 0 {
            return Err(anyhow!("monitor.command_timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = DaemonConfig::default();
        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.monitor.attach_grace(), Duration::from_secs(2));
        assert_eq!(config.monitor.command_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: DaemonConfig = toml::from_str(
            r#"
[monitor]
poll_interval_secs = 10
"#,
        )
        .unwrap();
        assert_eq!(config.monitor.poll_interval_secs, 10);
        assert_eq!(config.monitor.attach_grace_secs, 2);
        assert_eq!(config.daemon.log_level, "info");
    }

    #[test]
    fn empty_file_parses_to_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config.monitor.poll_interval_secs, 5);
        assert!(config.daemon.usbip_path.is_none());
    }

    #[test]
    fn full_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = DaemonConfig::default();
        config.daemon.log_level = "debug".to_string();
        config.daemon.usbip_path = Some("/usr/local/sbin/usbip".to_string());
        config.monitor.poll_interval_secs = 7;
        config.save(&path).unwrap();

        let loaded = DaemonConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.daemon.log_level, "debug");
        assert_eq!(
            loaded.daemon.usbip_path.as_deref(),
            Some("/usr/local/sbin/usbip")
        );
        assert_eq!(loaded.monitor.poll_interval_secs, 7);
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let config: DaemonConfig = toml::from_str(
            r#"
[monitor]
poll_interval_secs = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config: DaemonConfig = toml::from_str(
            r#"
[monitor]
command_timeout_secs = 0
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[monitor]\npoll_interval_secs = 0\n").unwrap();
        assert!(DaemonConfig::load(Some(path)).is_err());
    }
}
