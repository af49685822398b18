//! TCP acceptor.
//!
//! Binds the listener and spawns one session task per accepted
//! connection. Session outcomes never propagate here; every session
//! classifies and logs its own end.

use crate::config::Config;
use crate::session::{Session, IDLE_TIMEOUT};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Maximum number of concurrent connections
const MAX_CONNECTIONS: usize = 10000;

/// Server instance
pub struct Server {
    config: Config,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Create a new server instance
    pub fn new(config: Config) -> Self {
        Server {
            config,
            connection_limit: Arc::new(Semaphore::new(MAX_CONNECTIONS)),
        }
    }

    /// Start the server and begin accepting connections
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let listener =
            TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        info!(address = %listener.local_addr()?, "Server listening");

        let log_dir: Arc<PathBuf> = Arc::new(self.config.log_dir.clone());

        loop {
            // Wait for a connection slot
            let permit = self.connection_limit.clone().acquire_owned().await?;

            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "New connection");
                    let log_dir = Arc::clone(&log_dir);

                    tokio::spawn(async move {
                        let end = Session::new(stream, peer, log_dir.as_path(), IDLE_TIMEOUT)
                            .run()
                            .await;
                        debug!(%peer, end = ?end, "Session ended");
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
