//! Uptime Monitor Binary

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uptime_monitor::{server, Config, Result, Scheduler};

/// Probe services and publish static status pages
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Check file to read, overriding CHECKS_FILE
    #[arg(long)]
    checks_file: Option<PathBuf>,

    /// Serve the pages on this port, overriding PORT
    #[arg(long)]
    port: Option<u16>,

    /// Run a single tick and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(checks_file) = &self.checks_file {
            config.checks_file = checks_file.clone();
        }

        if let Some(port) = self.port {
            config.port = Some(port);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    initialize_tracing();

    info!("Starting uptime monitor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = Config::from_env();
    cli.apply(&mut config);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Monitor configuration - Checks: {}, History: {}, Interval: {}s, Max entries: {}",
        config.checks_file.display(),
        config.history_file.display(),
        config.check_interval.as_secs(),
        config.max_history_entries
    );

    let scheduler = match Scheduler::new(config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("Failed to start monitor: {}", e);
            std::process::exit(1);
        }
    };

    if cli.once {
        if let Err(e) = scheduler.tick().await {
            error!("Check run failed: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    match scheduler.config().port {
        Some(port) => {
            let server = server::serve(
                port,
                scheduler.config().index_page(),
                scheduler.config().history_page(),
            );

            tokio::select! {
                result = scheduler.run() => {
                    if let Err(e) = result {
                        error!("Monitor stopped: {}", e);
                        std::process::exit(1);
                    }
                }
                result = server => {
                    if let Err(e) = result {
                        error!("Server failed: {}", e);
                    }
                }
            }
        }
        None => {
            if let Err(e) = scheduler.run().await {
                error!("Monitor stopped: {}", e);
                std::process::exit(1);
            }
        }
    }

    info!("Bye!");
    Ok(())
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
