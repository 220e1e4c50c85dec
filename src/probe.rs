//! Probe implementations for the three check kinds
//!
//! A probe never fails: every error path collapses to `false`.

use crate::checks::{ProbeKind, ProbeSpec};
use crate::errors::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Trait for checking a single target
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, spec: &ProbeSpec) -> bool;
}

/// HTTP GET probe comparing the status code against the expected one
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(format!("uptime_monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, spec: &ProbeSpec) -> bool {
        match self.client.get(&spec.host).send().await {
            Ok(response) => {
                let status = i64::from(response.status().as_u16());
                // Body is never read; dropping the response releases the connection
                drop(response);

                if status != spec.expected_status_code {
                    debug!(
                        "Check {} returned {} (expected {})",
                        spec.name, status, spec.expected_status_code
                    );
                }
                status == spec.expected_status_code
            }
            Err(e) => {
                debug!("Check {} request to {} failed: {}", spec.name, spec.host, e);
                false
            }
        }
    }
}

/// ICMP echo through the system `ping` binary
#[derive(Debug, Clone)]
pub struct PingProbe {
    wait: Duration,
}

impl PingProbe {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }
}

#[cfg(target_os = "windows")]
fn ping_args(host: &str, wait: Duration) -> Vec<String> {
    vec![
        "-n".to_string(),
        "1".to_string(),
        "-w".to_string(),
        wait.as_millis().max(1).to_string(),
        host.to_string(),
    ]
}

#[cfg(target_os = "macos")]
fn ping_args(host: &str, wait: Duration) -> Vec<String> {
    vec![
        "-c".to_string(),
        "1".to_string(),
        "-t".to_string(),
        wait.as_secs().max(1).to_string(),
        host.to_string(),
    ]
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn ping_args(host: &str, wait: Duration) -> Vec<String> {
    vec![
        "-c".to_string(),
        "1".to_string(),
        "-W".to_string(),
        wait.as_secs().max(1).to_string(),
        host.to_string(),
    ]
}

#[async_trait]
impl Probe for PingProbe {
    async fn check(&self, spec: &ProbeSpec) -> bool {
        // A leading dash would be read by ping as an option
        if spec.host.is_empty() || spec.host.starts_with('-') {
            warn!("Check {} has an invalid ping host: {:?}", spec.name, spec.host);
            return false;
        }

        let mut command = Command::new("ping");
        command
            .args(ping_args(&spec.host, self.wait))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // ping enforces its own wait; the outer deadline only catches a stuck process
        let deadline = self.wait + Duration::from_secs(1);

        match timeout(deadline, command.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!("Check {} could not run ping: {}", spec.name, e);
                false
            }
            Err(_) => {
                debug!("Check {} ping exceeded {:?}", spec.name, deadline);
                false
            }
        }
    }
}

/// TCP connect probe
#[derive(Debug, Clone)]
pub struct PortProbe {
    dial_timeout: Duration,
}

impl PortProbe {
    pub fn new(dial_timeout: Duration) -> Self {
        Self { dial_timeout }
    }
}

#[async_trait]
impl Probe for PortProbe {
    async fn check(&self, spec: &ProbeSpec) -> bool {
        let Ok(port) = u16::try_from(spec.port) else {
            warn!("Check {} has an invalid port: {}", spec.name, spec.port);
            return false;
        };

        let connect = TcpStream::connect((spec.host.as_str(), port));

        match timeout(self.dial_timeout, connect).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                debug!(
                    "Check {} could not connect to {}:{}: {}",
                    spec.name, spec.host, port, e
                );
                false
            }
            Err(_) => {
                debug!(
                    "Check {} timed out connecting to {}:{}",
                    spec.name, spec.host, port
                );
                false
            }
        }
    }
}

/// Maps each probe kind to its implementation
pub struct ProbeRegistry {
    probes: HashMap<ProbeKind, Box<dyn Probe>>,
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeRegistry {
    /// An empty registry; every check reports down until probes are registered
    pub fn new() -> Self {
        Self {
            probes: HashMap::new(),
        }
    }

    /// Registry with the http, ping and port probes sharing one timeout
    pub fn standard(probe_timeout: Duration) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(ProbeKind::Http, HttpProbe::new(probe_timeout)?);
        registry.register(ProbeKind::Ping, PingProbe::new(probe_timeout));
        registry.register(ProbeKind::Port, PortProbe::new(probe_timeout));
        Ok(registry)
    }

    pub fn register<P: Probe + 'static>(&mut self, kind: ProbeKind, probe: P) {
        self.probes.insert(kind, Box::new(probe));
    }

    /// Run the probe matching the spec's kind
    pub async fn check(&self, spec: &ProbeSpec) -> bool {
        match self.probes.get(&spec.kind) {
            Some(probe) => probe.check(spec).await,
            None => {
                warn!(
                    "Check {} has unsupported type {}, reporting down",
                    spec.name, spec.kind
                );
                false
            }
        }
    }
}
