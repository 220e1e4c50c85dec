//! Concurrent fan-out of checks

use crate::checks::ProbeSpec;
use crate::probe::ProbeRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Outcome of one check in one tick
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeResult {
    pub name: String,
    pub up: bool,
}

impl ProbeResult {
    pub fn new(name: impl Into<String>, up: bool) -> Self {
        Self {
            name: name.into(),
            up,
        }
    }
}

/// Sort results by name for display; ties keep their relative order
pub fn sort_by_name(results: &mut [ProbeResult]) {
    results.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Runs every check of a tick concurrently
#[derive(Clone)]
pub struct ProbeRunner {
    registry: Arc<ProbeRegistry>,
}

impl ProbeRunner {
    pub fn new(registry: ProbeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Run all checks and return exactly one result per spec, in completion order.
    ///
    /// Each spec gets its own task; the channel holds every result so no task
    /// waits on the collector.
    pub async fn run_all(&self, specs: &[ProbeSpec]) -> Vec<ProbeResult> {
        if specs.is_empty() {
            return Vec::new();
        }

        let (tx, mut rx) = mpsc::channel(specs.len());

        for (index, spec) in specs.iter().cloned().enumerate() {
            let tx = tx.clone();
            let registry = Arc::clone(&self.registry);
            tokio::spawn(async move {
                let up = registry.check(&spec).await;
                let _ = tx.send((index, ProbeResult::new(spec.name, up))).await;
            });
        }
        drop(tx);

        let mut reported = vec![false; specs.len()];
        let mut results = Vec::with_capacity(specs.len());

        while results.len() < specs.len() {
            match rx.recv().await {
                Some((index, result)) => {
                    reported[index] = true;
                    results.push(result);
                }
                // Every sender is gone: some task died before reporting
                None => break,
            }
        }

        if results.len() < specs.len() {
            for (index, spec) in specs.iter().enumerate() {
                if !reported[index] {
                    error!("Check {} did not report a result, marking down", spec.name);
                    results.push(ProbeResult::new(spec.name.clone(), false));
                }
            }
        }

        debug!(
            "Ran {} checks, {} up",
            results.len(),
            results.iter().filter(|r| r.up).count()
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::ProbeKind;
    use crate::probe::Probe;
    use async_trait::async_trait;
    use std::time::{Duration, Instant};

    /// Sleeps for `port` milliseconds, then reports up when the host is "up"
    struct Scripted;

    #[async_trait]
    impl Probe for Scripted {
        async fn check(&self, spec: &ProbeSpec) -> bool {
            tokio::time::sleep(Duration::from_millis(spec.port.max(0) as u64)).await;
            spec.host == "up"
        }
    }

    struct Panicking;

    #[async_trait]
    impl Probe for Panicking {
        async fn check(&self, _spec: &ProbeSpec) -> bool {
            panic!("probe blew up");
        }
    }

    fn runner() -> ProbeRunner {
        let mut registry = ProbeRegistry::new();
        registry.register(ProbeKind::Port, Scripted);
        registry.register(ProbeKind::Ping, Panicking);
        ProbeRunner::new(registry)
    }

    fn scripted(name: &str, host: &str, delay_ms: u16) -> ProbeSpec {
        ProbeSpec::port(name, host, delay_ms)
    }

    #[tokio::test]
    async fn test_one_result_per_spec_with_duplicates() {
        let specs = vec![
            scripted("web", "up", 10),
            scripted("web", "down", 5),
            scripted("db", "up", 1),
        ];

        let mut results = runner().run_all(&specs).await;
        assert_eq!(results.len(), 3);

        sort_by_name(&mut results);
        assert_eq!(results[0], ProbeResult::new("db", true));
        assert_eq!(results.iter().filter(|r| r.name == "web").count(), 2);
        assert_eq!(results.iter().filter(|r| r.name == "web" && r.up).count(), 1);
    }

    #[tokio::test]
    async fn test_results_arrive_in_completion_order() {
        let specs = vec![scripted("slow", "up", 300), scripted("fast", "up", 1)];

        let results = runner().run_all(&specs).await;
        assert_eq!(results[0].name, "fast");
        assert_eq!(results[1].name, "slow");
    }

    #[tokio::test]
    async fn test_checks_run_concurrently() {
        let specs: Vec<ProbeSpec> = (0..8)
            .map(|i| scripted(&format!("svc-{}", i), "up", 300))
            .collect();

        let started = Instant::now();
        let results = runner().run_all(&specs).await;

        assert_eq!(results.len(), 8);
        assert!(results.iter().all(|r| r.up));
        // Sequential execution would take 2.4s
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_empty_input() {
        assert!(runner().run_all(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_probe_still_yields_a_result() {
        let specs = vec![ProbeSpec::ping("flaky", "10.0.0.1"), scripted("db", "up", 1)];

        let mut results = runner().run_all(&specs).await;
        sort_by_name(&mut results);

        assert_eq!(
            results,
            vec![ProbeResult::new("db", true), ProbeResult::new("flaky", false)]
        );
    }

    #[tokio::test]
    async fn test_unregistered_kind_reports_down() {
        let specs = vec![ProbeSpec::http("web", "http://example.invalid", 200)];
        let results = runner().run_all(&specs).await;
        assert_eq!(results, vec![ProbeResult::new("web", false)]);
    }
}
