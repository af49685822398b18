//! parley: a conversational TCP line-protocol server
//!
//! Speaks a newline-delimited text protocol on each accepted connection:
//! - a small command surface (`/time`, `/quit`, `/echo`)
//! - a conversational fallback (`hello`, `bye`, echo everything else)
//! - a 30-second inactivity timeout per session
//! - an append-only per-client log file under the log directory
//!
//! With `--probe <addr>` the binary instead checks outbound reachability
//! of the given addresses and exits.

mod config;
mod dispatch;
mod framing;
mod logging;
mod probe;
mod server;
mod session;

use config::Config;
use server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !config.probe.is_empty() {
        return run_probe(&config.probe).await;
    }

    // Sessions open their log files on accept; the directory must exist
    // before the first one does.
    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        error!(dir = %config.log_dir.display(), error = %e, "Failed to create log directory");
        return Err(e.into());
    }

    info!(
        host = %config.host,
        port = config.port,
        log_dir = %config.log_dir.display(),
        "Starting parley server"
    );

    Server::new(config).run().await
}

/// Probe mode: dial every target, report, exit non-zero if any target
/// was unreachable.
async fn run_probe(addrs: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let reports = probe::probe_all(addrs).await?;

    let mut unreachable = 0;
    for report in &reports {
        match report.connected_after {
            Some(attempt) => info!(addr = %report.addr, attempt, "Target reachable"),
            None => {
                error!(addr = %report.addr, "Target unreachable");
                unreachable += 1;
            }
        }
    }

    if unreachable > 0 {
        return Err(format!("{unreachable} of {} targets unreachable", reports.len()).into());
    }
    Ok(())
}
