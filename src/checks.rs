//! Check definitions and the YAML check-file loader

use crate::errors::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A single configured check
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProbeSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProbeKind,
    pub host: String,
    /// Kept as a plain integer so an out-of-range value fails only its own check
    #[serde(default)]
    pub port: i64,
    #[serde(default, rename = "expected_code")]
    pub expected_status_code: i64,
}

/// Probe mechanism; anything unrecognized parses as `Unknown`
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Http,
    Ping,
    Port,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Http => write!(f, "http"),
            ProbeKind::Ping => write!(f, "ping"),
            ProbeKind::Port => write!(f, "port"),
            ProbeKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl ProbeSpec {
    pub fn http(name: impl Into<String>, url: impl Into<String>, expected_code: u16) -> Self {
        Self {
            name: name.into(),
            kind: ProbeKind::Http,
            host: url.into(),
            port: 0,
            expected_status_code: i64::from(expected_code),
        }
    }

    pub fn ping(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ProbeKind::Ping,
            host: host.into(),
            port: 0,
            expected_status_code: 0,
        }
    }

    pub fn port(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            kind: ProbeKind::Port,
            host: host.into(),
            port: i64::from(port),
            expected_status_code: 0,
        }
    }
}

/// Parse a check list from YAML text
pub fn parse_checks(source: &str) -> Result<Vec<ProbeSpec>> {
    // An empty document is an empty list, not an error
    if source.trim().is_empty() {
        return Ok(Vec::new());
    }

    let checks: Vec<ProbeSpec> = serde_yaml::from_str(source)?;
    Ok(checks)
}

/// Read and parse the check file. Both failures are fatal to the caller.
pub async fn load_checks(path: &Path) -> Result<Vec<ProbeSpec>> {
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| MonitorError::Checks {
            path: path.display().to_string(),
            source,
        })?;

    let checks = parse_checks(&source)?;
    debug!("Loaded {} checks from {}", checks.len(), path.display());

    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
- name: website
  type: http
  host: https://example.com
  expected_code: 200
- name: gateway
  type: ping
  host: 10.0.0.1
- name: database
  type: port
  host: db.internal
  port: 5432
"#;

    #[test]
    fn test_parse_all_kinds() {
        let checks = parse_checks(SAMPLE).unwrap();

        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0], ProbeSpec::http("website", "https://example.com", 200));
        assert_eq!(checks[1], ProbeSpec::ping("gateway", "10.0.0.1"));
        assert_eq!(checks[2], ProbeSpec::port("database", "db.internal", 5432));
    }

    #[test]
    fn test_unrecognized_type_is_unknown() {
        let checks = parse_checks("- name: mail\n  type: smtp\n  host: mx.example.com\n").unwrap();

        assert_eq!(checks[0].kind, ProbeKind::Unknown);
        assert_eq!(checks[0].port, 0);
        assert_eq!(checks[0].expected_status_code, 0);
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let source = "- {name: web, type: ping, host: a}\n- {name: web, type: ping, host: b}\n";
        let checks = parse_checks(source).unwrap();
        assert_eq!(checks.len(), 2);
    }

    #[test]
    fn test_out_of_range_numbers_still_parse() {
        let source = r#"
- name: web
  type: ping
  host: 10.0.0.1
- name: db
  type: port
  host: 127.0.0.1
  port: 70000
- name: api
  type: http
  host: http://localhost
  expected_code: -1
"#;
        let checks = parse_checks(source).unwrap();

        assert_eq!(checks.len(), 3);
        assert_eq!(checks[1].port, 70000);
        assert_eq!(checks[2].expected_status_code, -1);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let err = parse_checks("name: [unterminated").unwrap_err();
        assert!(matches!(err, MonitorError::Yaml(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_checks(&dir.path().join("nope.yaml")).await.unwrap_err();

        assert!(matches!(err, MonitorError::Checks { .. }));
        assert!(err.is_fatal());
    }
}
