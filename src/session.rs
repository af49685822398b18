//! Per-connection session handling.
//!
//! A session owns one accepted connection for its entire lifetime: it
//! runs the read/dispatch loop, keeps an idle watchdog armed, and records
//! exactly one termination cause no matter which path reaches the close
//! first.

use crate::dispatch::{self, Action};
use crate::framing::{self, Frame};
use crate::logging::ClientLogger;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

/// How long a session may go without a completed read before the server
/// closes it.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a session ended. Exactly one cause is recorded per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer closed the connection (end of stream on read).
    PeerClosed,
    /// The bounded read elapsed with no data.
    IdleTimeout,
    /// The idle watchdog fired while the loop was busy elsewhere.
    Inactivity,
    /// Read failed for any other reason.
    ReadError(String),
    /// A response or farewell write failed.
    WriteError(String),
    /// The protocol asked for the close (`/quit`, `bye`, bare `/echo`).
    ProtocolQuit,
}

impl SessionEnd {
    /// Record written to the client log on close. Protocol termination
    /// has no record of its own; its trigger was already logged.
    fn record(&self) -> Option<String> {
        match self {
            SessionEnd::PeerClosed => Some("Disconnected".to_string()),
            SessionEnd::IdleTimeout => Some("Disconnected due to timeout".to_string()),
            SessionEnd::Inactivity => Some("Disconnected due to inactivity".to_string()),
            SessionEnd::ReadError(e) => Some(format!("Error reading: {e}")),
            SessionEnd::WriteError(e) => Some(format!("Error writing: {e}")),
            SessionEnd::ProtocolQuit => None,
        }
    }
}

/// One accepted connection, owned end to end.
pub struct Session {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    logger: ClientLogger,
    idle_timeout: Duration,
    /// Close latch shared with the watchdog. Whoever flips it first owns
    /// the close; everyone else stands down.
    closing: Arc<AtomicBool>,
}

impl Session {
    /// Take ownership of an accepted connection and open its client log.
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        log_dir: &Path,
        idle_timeout: Duration,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        let logger = ClientLogger::open(&peer.to_string(), log_dir);

        Session {
            reader: BufReader::new(read_half),
            writer: write_half,
            logger,
            idle_timeout,
            closing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the session to completion and return the recorded cause.
    ///
    /// Every outcome is classified and logged here; nothing propagates to
    /// the acceptor.
    pub async fn run(mut self) -> SessionEnd {
        self.logger.log("Connected");

        let (deadline_tx, deadline_rx) = watch::channel(Instant::now() + self.idle_timeout);
        let fired = Arc::new(Notify::new());
        spawn_watchdog(deadline_rx, Arc::clone(&self.closing), Arc::clone(&fired));

        let cause = self.serve(&deadline_tx, &fired).await;

        // Latch before the final record so a late watchdog fire cannot
        // touch a session that is already gone.
        self.closing.store(true, Ordering::SeqCst);
        drop(deadline_tx);

        if let Some(record) = cause.record() {
            self.logger.log(&record);
        }
        let _ = self.writer.shutdown().await;

        cause
    }

    /// The read/dispatch loop. Returns the first termination cause.
    async fn serve(&mut self, deadline: &watch::Sender<Instant>, fired: &Notify) -> SessionEnd {
        let mut line = String::new();

        loop {
            // Re-arm the watchdog unconditionally, length violations
            // included.
            let _ = deadline.send(Instant::now() + self.idle_timeout);

            line.clear();
            let read = tokio::select! {
                res = tokio::time::timeout(
                    self.idle_timeout,
                    self.reader.read_line(&mut line),
                ) => res,
                _ = fired.notified() => return SessionEnd::Inactivity,
            };

            match read {
                Ok(Ok(0)) => return SessionEnd::PeerClosed,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    // A read error after the watchdog latched is the
                    // watchdog's close, not a failure of its own.
                    if self.closing.load(Ordering::SeqCst) {
                        return SessionEnd::Inactivity;
                    }
                    return SessionEnd::ReadError(e.to_string());
                }
                Err(_) => {
                    if self.closing.load(Ordering::SeqCst) {
                        return SessionEnd::Inactivity;
                    }
                    return SessionEnd::IdleTimeout;
                }
            }

            let message = match framing::frame_line(&line) {
                Frame::TooLong { len } => {
                    self.logger.log(&format!("Message too long ({len} bytes)"));
                    if let Err(e) = self.write_line(&framing::too_long_notice()).await {
                        return SessionEnd::WriteError(e.to_string());
                    }
                    continue;
                }
                Frame::Message(message) => message,
            };

            self.logger.log(&format!("Received: {message}"));

            match dispatch::dispatch(&message) {
                Action::Respond(reply) => {
                    if let Err(e) = self.write_line(&reply).await {
                        return SessionEnd::WriteError(e.to_string());
                    }
                }
                Action::Terminate { farewell, note } => {
                    if let Some(note) = note {
                        self.logger.log(note);
                    }
                    if let Some(farewell) = farewell {
                        if let Err(e) = self.write_line(&farewell).await {
                            return SessionEnd::WriteError(e.to_string());
                        }
                    }
                    return SessionEnd::ProtocolQuit;
                }
            }
        }
    }

    /// Write one line to the peer. Writes carry no deadline; a stalled
    /// peer can hold one indefinitely.
    async fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await
    }
}

/// Spawn the idle watchdog for one session.
///
/// The watchdog sleeps until the current deadline and re-arms itself
/// whenever the session pushes a new one. If the deadline passes without
/// a re-arm it latches the close and wakes the session; if the latch is
/// already set, the session got there first and the watchdog stands down.
/// Dropping the deadline sender stops it.
fn spawn_watchdog(
    mut deadline: watch::Receiver<Instant>,
    closing: Arc<AtomicBool>,
    fired: Arc<Notify>,
) {
    tokio::spawn(async move {
        loop {
            let at = *deadline.borrow_and_update();
            tokio::select! {
                _ = tokio::time::sleep_until(at) => {
                    if !closing.swap(true, Ordering::SeqCst) {
                        fired.notify_one();
                    }
                    return;
                }
                changed = deadline.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    });
}
