//! Runtime configuration for the uptime monitor

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pause between two ticks
    pub check_interval: Duration,

    /// Maximum retained history entries per service
    pub max_history_entries: usize,

    /// YAML file listing the checks to run
    pub checks_file: PathBuf,

    /// HTML fragment shown on the status page
    pub incidents_file: PathBuf,

    /// JSON file backing the status history
    pub history_file: PathBuf,

    /// Directory the status pages are written to
    pub output_dir: PathBuf,

    /// Timeout applied to every probe kind
    pub probe_timeout: Duration,

    /// Port for the page server; no server when unset
    pub port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            max_history_entries: 10,
            checks_file: PathBuf::from("checks.yaml"),
            incidents_file: PathBuf::from("incidents.html"),
            history_file: PathBuf::from("history.json"),
            output_dir: PathBuf::from("."),
            probe_timeout: Duration::from_secs(2),
            port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(interval) = lookup("CHECK_INTERVAL") {
            if let Ok(seconds) = interval.trim().parse::<u64>() {
                config.check_interval = Duration::from_secs(seconds);
            }
        }

        if let Some(max_entries) = lookup("MAX_HISTORY_ENTRIES") {
            if let Ok(entries) = max_entries.trim().parse() {
                config.max_history_entries = entries;
            }
        }

        if let Some(checks_file) = lookup("CHECKS_FILE") {
            config.checks_file = PathBuf::from(checks_file);
        }

        if let Some(incidents_file) = lookup("INCIDENTS_FILE") {
            config.incidents_file = PathBuf::from(incidents_file);
        }

        if let Some(history_file) = lookup("STATUS_HISTORY_FILE") {
            config.history_file = PathBuf::from(history_file);
        }

        if let Some(output_dir) = lookup("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(output_dir);
        }

        if let Some(timeout) = lookup("PROBE_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.trim().parse::<u64>() {
                config.probe_timeout = Duration::from_secs(seconds);
            }
        }

        if let Some(port) = lookup("PORT") {
            // An empty PORT means "no server"
            config.port = port.trim().parse().ok();
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.check_interval.is_zero() {
            return Err("check_interval must be greater than 0".to_string());
        }

        if self.max_history_entries == 0 {
            return Err("max_history_entries must be greater than 0".to_string());
        }

        if self.checks_file.as_os_str().is_empty() {
            return Err("checks_file cannot be empty".to_string());
        }

        if self.history_file.as_os_str().is_empty() {
            return Err("history_file cannot be empty".to_string());
        }

        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn index_page(&self) -> PathBuf {
        self.output_dir.join("index.html")
    }

    pub fn history_page(&self) -> PathBuf {
        self.output_dir.join("history.html")
    }
}
