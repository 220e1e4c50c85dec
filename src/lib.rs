//! Uptime Monitor Library
//!
//! This library probes a configured set of services over HTTP, ICMP ping and
//! TCP, keeps a bounded per-service status history, and renders static status
//! pages from it.

pub mod config;
pub mod checks;
pub mod probe;
pub mod runner;
pub mod history;
pub mod render;
pub mod scheduler;
pub mod server;
pub mod errors;

pub use config::Config;
pub use checks::{ProbeKind, ProbeSpec};
pub use probe::{Probe, ProbeRegistry};
pub use runner::{ProbeResult, ProbeRunner};
pub use history::{HistoryEntry, HistoryFile, HistoryStore};
pub use render::{StatusReport, StatusSink};
pub use scheduler::Scheduler;
pub use errors::{MonitorError, Result};
