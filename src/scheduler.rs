//! The monitoring loop: check, record, render, sleep

use crate::checks::load_checks;
use crate::config::Config;
use crate::errors::{MonitorError, Result};
use crate::history::HistoryFile;
use crate::probe::ProbeRegistry;
use crate::render::{load_incidents, HtmlPages, StatusReport, StatusSink};
use crate::runner::ProbeRunner;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, instrument};

pub struct Scheduler {
    config: Arc<Config>,
    runner: ProbeRunner,
    history: HistoryFile,
    sinks: Vec<Box<dyn StatusSink>>,
}

impl Scheduler {
    /// Scheduler with the standard probes and the HTML pages as its only sink
    pub fn new(config: Config) -> Result<Self> {
        config.validate().map_err(MonitorError::Config)?;

        let registry = ProbeRegistry::standard(config.probe_timeout)?;
        let pages = HtmlPages::new(config.index_page(), config.history_page());

        Ok(Self::with_parts(config, ProbeRunner::new(registry), vec![Box::new(pages)]))
    }

    pub fn with_parts(
        config: Config,
        runner: ProbeRunner,
        sinks: Vec<Box<dyn StatusSink>>,
    ) -> Self {
        let history = HistoryFile::new(config.history_file.clone(), config.max_history_entries);

        Self {
            config: Arc::new(config),
            runner,
            history,
            sinks,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one tick. An unreadable check file fails before anything is written.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<StatusReport> {
        let checks = load_checks(&self.config.checks_file).await?;

        let results = self.runner.run_all(&checks).await;

        let update = self.history.update(&results).await;
        if let Err(e) = update.persisted {
            error!("Failed to save history to {}: {}", self.history.path().display(), e);
        }

        let incidents = load_incidents(&self.config.incidents_file).await;
        let report = StatusReport::new(results, update.store, incidents, Utc::now());

        for sink in &self.sinks {
            sink.publish(&report).await?;
        }

        info!(
            "Status pages updated: {}/{} checks up",
            report.up_count(),
            report.results.len()
        );

        Ok(report)
    }

    /// Tick forever; returns only on a fatal error
    pub async fn run(&self) -> Result<()> {
        info!(
            "Monitoring services every {}s from {}",
            self.config.check_interval.as_secs(),
            self.config.checks_file.display()
        );

        loop {
            match self.tick().await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => error!("Tick failed: {}", e),
            }

            sleep(self.config.check_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ProbeResult;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct Recorder {
        reports: Arc<Mutex<Vec<Vec<ProbeResult>>>>,
    }

    #[async_trait]
    impl StatusSink for Recorder {
        async fn publish(&self, report: &StatusReport) -> Result<()> {
            self.reports.lock().unwrap().push(report.results.clone());
            Ok(())
        }
    }

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            checks_file: dir.join("checks.yaml"),
            incidents_file: dir.join("incidents.html"),
            history_file: dir.join("history.json"),
            output_dir: dir.to_path_buf(),
            max_history_entries: 3,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_tick_feeds_history_and_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::fs::write(
            dir.path().join("checks.yaml"),
            format!(
                "- {{name: db, type: port, host: 127.0.0.1, port: {}}}\n\
                 - {{name: mail, type: smtp, host: x}}\n",
                port
            ),
        )
        .await
        .unwrap();

        let recorder = Recorder::default();
        let reports = Arc::clone(&recorder.reports);
        let config = config_in(dir.path());
        let registry = ProbeRegistry::standard(config.probe_timeout).unwrap();
        let scheduler =
            Scheduler::with_parts(config, ProbeRunner::new(registry), vec![Box::new(recorder)]);

        let report = scheduler.tick().await.unwrap();

        assert_eq!(
            report.results,
            vec![ProbeResult::new("db", true), ProbeResult::new("mail", false)]
        );
        assert_eq!(report.incidents, crate::render::DEFAULT_INCIDENTS);
        assert_eq!(report.history.entries("db").unwrap().len(), 1);
        assert_eq!(reports.lock().unwrap().len(), 1);
        assert!(dir.path().join("history.json").exists());
    }

    #[tokio::test]
    async fn test_unwritable_history_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("checks.yaml"),
            "- {name: mail, type: smtp, host: mx.example.com}\n",
        )
        .await
        .unwrap();

        let config = Config {
            history_file: dir.path().join("missing-dir").join("history.json"),
            ..config_in(dir.path())
        };
        let scheduler = Scheduler::new(config).unwrap();

        let report = scheduler.tick().await.unwrap();

        assert_eq!(report.results, vec![ProbeResult::new("mail", false)]);
        assert_eq!(report.history.entries("mail").unwrap().len(), 1);
        assert!(!dir.path().join("missing-dir").exists());

        let history_page = std::fs::read_to_string(dir.path().join("history.html")).unwrap();
        assert!(history_page.contains("<h2>mail</h2>"));
        assert!(dir.path().join("index.html").exists());
    }

    #[tokio::test]
    async fn test_missing_checks_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Scheduler::new(config_in(dir.path())).unwrap();

        let err = scheduler.run().await.unwrap_err();

        assert!(err.is_fatal());
        assert!(!dir.path().join("index.html").exists());
        assert!(!dir.path().join("history.json").exists());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            max_history_entries: 0,
            ..Config::default()
        };
        assert!(matches!(Scheduler::new(config), Err(MonitorError::Config(_))));
    }
}
