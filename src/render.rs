//! Static status pages built from each tick's report

use crate::errors::{MonitorError, Result};
use crate::history::{HistoryEntry, HistoryStore};
use crate::runner::{sort_by_name, ProbeResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Shown when no incidents file is available
pub const DEFAULT_INCIDENTS: &str = "<h2>All Fine!</h2>";

/// Everything a renderer gets at the end of a tick
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Current results, sorted by name
    pub results: Vec<ProbeResult>,
    pub history: HistoryStore,
    /// Trusted HTML fragment
    pub incidents: String,
    pub last_updated: DateTime<Utc>,
}

impl StatusReport {
    pub fn new(
        mut results: Vec<ProbeResult>,
        history: HistoryStore,
        incidents: String,
        last_updated: DateTime<Utc>,
    ) -> Self {
        sort_by_name(&mut results);
        Self {
            results,
            history,
            incidents,
            last_updated,
        }
    }

    pub fn up_count(&self) -> usize {
        self.results.iter().filter(|r| r.up).count()
    }
}

/// Receives the report of every tick
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish(&self, report: &StatusReport) -> Result<()>;
}

/// Read the incident notes, falling back to the default fragment
pub async fn load_incidents(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(incidents) => incidents,
        Err(e) => {
            warn!("Failed to load incidents from {}: {}", path.display(), e);
            DEFAULT_INCIDENTS.to_string()
        }
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn status_label(up: bool) -> &'static str {
    if up { "Up" } else { "Down" }
}

fn status_class(up: bool) -> &'static str {
    if up { "status-up" } else { "status-down" }
}

fn format_last_updated(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// "2024-05-01T12:00:00Z" becomes "2024-05-01 12:00:00"
fn format_entry_time(entry: &HistoryEntry) -> String {
    match entry.timestamp.split_once('T') {
        Some((date, time)) => {
            let clock: String = time.chars().take(8).collect();
            format!("{} {}", date, clock)
        }
        None => entry.timestamp.clone(),
    }
}

const STYLE: &str = r#"
        body { font-family: sans-serif; line-height: 1.6; color: #e0e0e0; max-width: 1200px; margin: auto; padding: 20px; background: #181818; }
        h1, h2 { color: #e0e0e0; text-align: center; }
        .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(250px, 1fr)); gap: 20px; margin-bottom: 40px; }
        .item { background: #242424; border-radius: 8px; padding: 15px; box-shadow: 0 2px 4px rgba(255,255,255,0.1); max-height: 300px; overflow: auto; }
        .item h2 { font-size: 1.2rem; margin: 0; }
        .entry { margin-bottom: 5px; font-size: 0.9rem; display: flex; justify-content: space-between; }
        .status-up { color: #27ae60; }
        .status-down { color: #e74c3c; }
        .footer { text-align: center; font-size: 0.9rem; color: #888; }
        .footer a { color: #3498db; text-decoration: none; }
"#;

fn page_head(out: &mut String, title: &str) {
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n    <meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <title>{}</title>\n    <style>{}    </style>\n</head>\n<body>\n<h1>{}</h1>\n",
        title, STYLE, title
    );
}

fn page_footer(out: &mut String, last_updated: &DateTime<Utc>, link: (&str, &str)) {
    let _ = write!(
        out,
        "<div class=\"footer\">\n    <p>Last updated: {}</p>\n    <p><a href=\"{}\">{}</a></p>\n</div>\n</body>\n</html>\n",
        format_last_updated(last_updated),
        link.0,
        link.1
    );
}

/// Current status page
pub fn render_status_page(report: &StatusReport) -> String {
    let mut out = String::new();
    page_head(&mut out, "Service Status");

    out.push_str("<div class=\"grid\">\n");
    for result in &report.results {
        let _ = write!(
            out,
            "    <div class=\"item\">\n        <h2>{}</h2>\n        <p class=\"{}\">{}</p>\n    </div>\n",
            escape_html(&result.name),
            status_class(result.up),
            status_label(result.up)
        );
    }
    out.push_str("</div>\n");

    // Incident notes are operator-authored HTML and go in verbatim
    let _ = write!(out, "<div class=\"incidents\">\n{}\n</div>\n", report.incidents);

    page_footer(&mut out, &report.last_updated, ("/history", "History"));
    out
}

/// Per-service history page
pub fn render_history_page(history: &HistoryStore, last_updated: &DateTime<Utc>) -> String {
    let mut out = String::new();
    page_head(&mut out, "Status History");

    out.push_str("<div class=\"grid\">\n");
    for (service, entries) in history.iter() {
        let _ = write!(
            out,
            "    <div class=\"item\">\n        <h2>{}</h2>\n",
            escape_html(service)
        );
        for entry in entries {
            let _ = write!(
                out,
                "        <div class=\"entry\">\n            <span>{}</span>\n            \
                 <span class=\"{}\">{}</span>\n        </div>\n",
                escape_html(&format_entry_time(entry)),
                status_class(entry.up),
                status_label(entry.up)
            );
        }
        out.push_str("    </div>\n");
    }
    out.push_str("</div>\n");

    page_footer(&mut out, last_updated, ("/", "Current status"));
    out
}

/// Writes `index.html` and `history.html`
#[derive(Debug, Clone)]
pub struct HtmlPages {
    index_path: PathBuf,
    history_path: PathBuf,
}

impl HtmlPages {
    pub fn new(index_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            history_path: history_path.into(),
        }
    }

    async fn write_page(path: &Path, html: String) -> Result<()> {
        tokio::fs::write(path, html).await.map_err(|e| {
            MonitorError::Render(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl StatusSink for HtmlPages {
    async fn publish(&self, report: &StatusReport) -> Result<()> {
        Self::write_page(&self.index_path, render_status_page(report)).await?;
        Self::write_page(
            &self.history_path,
            render_history_page(&report.history, &report.last_updated),
        )
        .await?;

        debug!(
            "Wrote {} and {}",
            self.index_path.display(),
            self.history_path.display()
        );
        Ok(())
    }
}
