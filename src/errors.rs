//! Error types for the uptime monitor

use std::fmt;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP client could not be built
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Check file could not be parsed
    Yaml(serde_yaml::Error),

    /// Runtime configuration is invalid
    Config(String),

    /// The check file could not be read
    Checks { path: String, source: std::io::Error },

    /// A status page could not be written
    Render(String),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Io(err) => write!(f, "IO error: {}", err),
            MonitorError::Http(err) => write!(f, "HTTP client error: {}", err),
            MonitorError::Json(err) => write!(f, "JSON error: {}", err),
            MonitorError::Yaml(err) => write!(f, "Failed to parse checks file: {}", err),
            MonitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MonitorError::Checks { path, source } => {
                write!(f, "Failed to load checks file {}: {}", path, source)
            }
            MonitorError::Render(msg) => write!(f, "Render error: {}", msg),
            MonitorError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(err) => Some(err),
            MonitorError::Http(err) => Some(err),
            MonitorError::Json(err) => Some(err),
            MonitorError::Yaml(err) => Some(err),
            MonitorError::Checks { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err)
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http(err)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Json(err)
    }
}

impl From<serde_yaml::Error> for MonitorError {
    fn from(err: serde_yaml::Error) -> Self {
        MonitorError::Yaml(err)
    }
}

impl MonitorError {
    /// Whether this error must stop the scheduler
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MonitorError::Checks { .. }
                | MonitorError::Yaml(_)
                | MonitorError::Config(_)
                | MonitorError::Render(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_checks_error_carries_path_and_source() {
        let err = MonitorError::Checks {
            path: "checks.yaml".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };

        assert!(err.to_string().contains("checks.yaml"));
        assert!(err.source().is_some());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_io_error_is_recoverable() {
        let err: MonitorError = std::io::Error::other("disk full").into();
        assert!(!err.is_fatal());
    }
}
