//! Runtime settings

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Tunables loaded from an optional settings file and the environment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Ceiling on connect + copy + execute for one host
    #[serde(default = "default_host_timeout")]
    pub host_timeout_secs: u64,

    /// SSH connection establishment timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Detail document written by `--report`
    #[serde(default = "default_report_file")]
    pub report_file: String,

    /// Port for host lines without one
    #[serde(default = "default_port")]
    pub default_port: u16,
}

fn default_host_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_report_file() -> String {
    analyzer_lib::report::DEFAULT_DETAIL_FILE.to_string()
}

fn default_port() -> u16 {
    analyzer_lib::dispatch::DEFAULT_SSH_PORT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host_timeout_secs: default_host_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            report_file: default_report_file(),
            default_port: default_port(),
        }
    }
}

impl Settings {
    /// Load settings, environment variables taking precedence over the file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("POD_ANALYZER"))
            .build()
            .context("Failed to load settings")?;

        config
            .try_deserialize()
            .context("Failed to parse settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.host_timeout_secs, 300);
        assert_eq!(settings.connect_timeout_secs, 30);
        assert_eq!(settings.report_file, "report.json");
        assert_eq!(settings.default_port, 22);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "host_timeout_secs = 60\nreport_file = \"detail.json\"\n").unwrap();

        let settings = Settings::load(Some(path.as_path())).unwrap();
        assert_eq!(settings.host_timeout_secs, 60);
        assert_eq!(settings.report_file, "detail.json");
        assert_eq!(settings.connect_timeout_secs, 30);
    }

    #[test]
    fn test_missing_settings_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Settings::load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }
}
