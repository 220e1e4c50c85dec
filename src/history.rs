//! Bounded per-service status history backed by a JSON file
//!
//! The store is loaded at the start of every tick, updated, and written back
//! in full. Nothing is cached between ticks.

use crate::errors::Result;
use crate::runner::ProbeResult;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    /// RFC3339 time of the tick that produced this entry
    pub timestamp: String,
    #[serde(alias = "status")]
    pub up: bool,
}

impl HistoryEntry {
    pub fn new(timestamp: impl Into<String>, up: bool) -> Self {
        Self {
            timestamp: timestamp.into(),
            up,
        }
    }

    /// Parsed timestamp; unparseable values sort as the earliest possible time
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Service name to entries, newest first
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HistoryStore {
    #[serde(deserialize_with = "services_or_null")]
    services: BTreeMap<String, Vec<HistoryEntry>>,
}

/// A service stored as `null` reads as having no entries
fn services_or_null<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Vec<HistoryEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let services = BTreeMap::<String, Option<Vec<HistoryEntry>>>::deserialize(deserializer)?;
    Ok(services
        .into_iter()
        .map(|(name, entries)| (name, entries.unwrap_or_default()))
        .collect())
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn entries(&self, service: &str) -> Option<&[HistoryEntry]> {
        self.services.get(service).map(Vec::as_slice)
    }

    /// Services in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[HistoryEntry])> {
        self.services
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// Record one tick's results under a single shared timestamp.
    ///
    /// Each touched service is re-sorted newest first and cut to `cap`.
    /// Services without a result in this batch are left alone.
    pub fn record(&mut self, results: &[ProbeResult], now: DateTime<Utc>, cap: usize) {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        for result in results {
            let entries = self.services.entry(result.name.clone()).or_default();

            // Insert at the front so a stable sort keeps the newest first on ties
            entries.insert(0, HistoryEntry::new(timestamp.clone(), result.up));
            entries.sort_by_key(|entry| std::cmp::Reverse(entry.time()));
            entries.truncate(cap);
        }
    }
}

impl FromIterator<(String, Vec<HistoryEntry>)> for HistoryStore {
    fn from_iter<I: IntoIterator<Item = (String, Vec<HistoryEntry>)>>(iter: I) -> Self {
        Self {
            services: iter.into_iter().collect(),
        }
    }
}

/// Outcome of a load, record and save cycle
#[derive(Debug)]
pub struct HistoryUpdate {
    pub store: HistoryStore,
    /// Save status; a failure loses this tick's entries but nothing else
    pub persisted: Result<()>,
}

/// The history backing file
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
    max_entries: usize,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store; a missing or unreadable file is an empty history
    pub async fn load(&self) -> HistoryStore {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No history file at {}, starting empty", self.path.display());
                return HistoryStore::new();
            }
            Err(e) => {
                warn!("Failed to read history file {}: {}", self.path.display(), e);
                return HistoryStore::new();
            }
        };

        match serde_json::from_slice::<Option<HistoryStore>>(&contents) {
            Ok(store) => store.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to parse history file {}: {}", self.path.display(), e);
                HistoryStore::new()
            }
        }
    }

    /// Overwrite the backing file with the full store
    pub async fn save(&self, store: &HistoryStore) -> Result<()> {
        let json = serde_json::to_vec_pretty(store)?;
        tokio::fs::write(&self.path, json).await?;

        debug!("Saved history for {} services", store.len());
        Ok(())
    }

    /// Load, record `results` stamped with the current time, and save
    pub async fn update(&self, results: &[ProbeResult]) -> HistoryUpdate {
        self.update_at(results, Utc::now()).await
    }

    pub async fn update_at(&self, results: &[ProbeResult], now: DateTime<Utc>) -> HistoryUpdate {
        let mut store = self.load().await;
        store.record(results, now, self.max_entries);
        let persisted = self.save(&store).await;

        HistoryUpdate { store, persisted }
    }
}
