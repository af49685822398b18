//! Outbound connectivity probing.
//!
//! A bounded pool of workers dials each target address, retrying a fixed
//! number of times with exponential backoff, and reports whether the
//! target accepted a TCP connection.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Concurrent dial workers.
const POOL_SIZE: usize = 4;

/// Connect attempts per address.
const MAX_ATTEMPTS: u32 = 3;

/// Backoff before the second attempt; doubles on each retry.
const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Per-attempt connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of probing one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// The address as given.
    pub addr: String,
    /// Attempt (1-based) that connected, or `None` when every attempt
    /// failed.
    pub connected_after: Option<u32>,
}

impl ProbeReport {
    /// Whether the target accepted a connection.
    pub fn reachable(&self) -> bool {
        self.connected_after.is_some()
    }
}

/// Probe every address, with at most [`POOL_SIZE`] dials in flight.
///
/// Reports come back in input order.
pub async fn probe_all(addrs: &[String]) -> Result<Vec<ProbeReport>, Box<dyn std::error::Error>> {
    let pool = Arc::new(Semaphore::new(POOL_SIZE));
    let mut tasks = Vec::with_capacity(addrs.len());

    for addr in addrs {
        // Take a worker slot before spawning so at most POOL_SIZE dials
        // run at once.
        let permit = pool.clone().acquire_owned().await?;
        let addr = addr.clone();

        tasks.push(tokio::spawn(async move {
            let report = probe_one(addr).await;
            drop(permit);
            report
        }));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reports.push(task.await?);
    }
    Ok(reports)
}

/// Dial one address with the fixed retry budget.
async fn probe_one(addr: String) -> ProbeReport {
    let mut backoff = BASE_BACKOFF;

    for attempt in 1..=MAX_ATTEMPTS {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => {
                info!(%addr, attempt, "Probe connected");
                return ProbeReport {
                    addr,
                    connected_after: Some(attempt),
                };
            }
            Ok(Err(e)) => {
                warn!(%addr, attempt, error = %e, "Probe attempt failed");
            }
            Err(_) => {
                warn!(%addr, attempt, "Probe attempt timed out");
            }
        }

        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    ProbeReport {
        addr,
        connected_after: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_listening_address_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let reports = probe_all(&[addr.clone()]).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].addr, addr);
        assert_eq!(reports[0].connected_after, Some(1));
        assert!(reports[0].reachable());
    }

    #[tokio::test]
    async fn test_refused_address_exhausts_retries() {
        // Port 1 on loopback refuses immediately on any sane test host.
        let reports = probe_all(&["127.0.0.1:1".to_string()]).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].reachable());
        assert_eq!(reports[0].connected_after, None);
    }

    #[tokio::test]
    async fn test_reports_preserve_input_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let up = listener.local_addr().unwrap().to_string();
        let addrs = vec!["127.0.0.1:1".to_string(), up.clone()];

        let reports = probe_all(&addrs).await.unwrap();
        assert_eq!(reports[0].addr, "127.0.0.1:1");
        assert!(!reports[0].reachable());
        assert_eq!(reports[1].addr, up);
        assert!(reports[1].reachable());
    }
}
