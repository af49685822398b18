//! Per-client event logging.
//!
//! Every session event is recorded twice: to the process log via
//! `tracing`, and to an append-only per-client file named after the peer
//! address. The file sink is best-effort; when it cannot be opened the
//! session carries on with the process sink alone.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Timestamp format for file records, second resolution.
const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Dual-sink event recorder for one client connection.
///
/// Owned by exactly one session: opened when the session starts, released
/// on every exit path when the session ends.
pub struct ClientLogger {
    peer: String,
    file: Option<File>,
}

impl ClientLogger {
    /// Open the logger for `peer`, creating or appending to the
    /// per-client file under `log_dir`.
    ///
    /// An unopenable file is reported here, once; the logger then
    /// degrades to the process sink only.
    pub fn open(peer: &str, log_dir: &Path) -> Self {
        let path = client_log_path(peer, log_dir);
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(peer, path = %path.display(), error = %e, "Failed to open client log file");
                None
            }
        };

        ClientLogger {
            peer: peer.to_string(),
            file,
        }
    }

    /// Record one event to both sinks.
    pub fn log(&mut self, message: &str) {
        info!(peer = %self.peer, "{}", message);

        if let Some(file) = self.file.as_mut() {
            let timestamp = Local::now().format(RECORD_TIME_FORMAT);
            let _ = writeln!(file, "[{timestamp}] {message}");
        }
    }
}

/// Derive the per-client log path from the peer address.
///
/// `:` and `.` are replaced with filesystem-safe separators before the
/// extension is appended.
fn client_log_path(peer: &str, log_dir: &Path) -> PathBuf {
    let safe = peer.replace(':', "_").replace('.', "-");
    log_dir.join(format!("{safe}.log"))
}
