//! Tokio driver for sniff sessions
//!
//! Runs one [`SniffSession`] per connection on the task that owns the
//! connection. Readiness comes from tokio's edge-triggered reactor and the
//! timeout from `tokio::time`; both are turned into [`SessionEvent`]
//! messages for the session, which stays single-threaded and lock-free.
//!
//! The session waits on a duplicate registration of the socket. Only the
//! duplicate's readiness is ever cleared, so the caller's stream still
//! reports the queued bytes once detection gives up on them.

use log::debug;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::Interest;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::{self, Instant};

use crate::common::{duplicate_stream, SnifferError, Result};
use crate::config::SnifferConfig;
use super::event::{EventLoop, Registration, SessionEvent};
use super::session::{Outcome, ReadProgress, SniffSession, SniffSettings};
use super::signature::SignatureTable;

/// Registration backed by a flag the driver loop checks before every wait
struct TaskRegistration(Arc<AtomicBool>);

impl Registration for TaskRegistration {
    fn cancel(&mut self) {
        self.0.store(false, Ordering::Release);
    }

    fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Event loop for a single connection driven by the current task
#[derive(Default)]
struct TaskEventLoop {
    readable: Option<Arc<AtomicBool>>,
    timer: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl EventLoop for TaskEventLoop {
    fn watch_readable(&mut self) -> Result<Box<dyn Registration>> {
        if self.readable.is_some() {
            return Err(SnifferError::Registration("socket is already watched".to_string()));
        }
        let flag = Arc::new(AtomicBool::new(true));
        self.readable = Some(Arc::clone(&flag));
        Ok(Box::new(TaskRegistration(flag)))
    }

    fn arm_timer(&mut self, timeout: Duration) -> Result<Box<dyn Registration>> {
        if self.timer.is_some() {
            return Err(SnifferError::Registration("detection timer is already armed".to_string()));
        }
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or_else(|| SnifferError::Registration(format!("timeout {:?} is out of range", timeout)))?;
        let flag = Arc::new(AtomicBool::new(true));
        self.timer = Some(Arc::clone(&flag));
        self.deadline = Some(deadline);
        Ok(Box::new(TaskRegistration(flag)))
    }
}

/// Protocol sniffer for TCP connections
///
/// Cheap to clone; the signature table is shared read-only.
#[derive(Debug, Clone)]
pub struct Sniffer {
    table: Arc<SignatureTable>,
    settings: SniffSettings,
}

impl Default for Sniffer {
    fn default() -> Self {
        Self::new(Arc::new(SignatureTable::default()), SniffSettings::default())
    }
}

impl Sniffer {
    pub fn new(table: Arc<SignatureTable>, settings: SniffSettings) -> Self {
        Self { table, settings }
    }

    /// Build a sniffer from validated configuration
    pub fn from_config(config: &SnifferConfig) -> Result<Self> {
        let table = config.signature_table()?;
        Ok(Self::new(Arc::new(table), config.sniff_settings()))
    }

    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    pub fn settings(&self) -> &SniffSettings {
        &self.settings
    }

    /// Detect the protocol spoken on `stream`
    ///
    /// Peeks only: every byte stays queued on the socket for whoever reads
    /// `stream` next. Detection failures are reported as
    /// [`Outcome::Failed`] or [`Outcome::Unmatched`]; dropping the returned
    /// future cancels detection.
    ///
    /// # Errors
    ///
    /// Returns `SnifferError::Io` if the socket cannot be registered a second
    /// time, and `SnifferError::Registration` if the session cannot register
    /// for readiness or arm its timer.
    pub async fn sniff(&self, stream: &TcpStream) -> Result<Outcome> {
        let watcher = duplicate_stream(stream)?;
        let (tx, mut rx) = oneshot::channel();
        let mut event_loop = TaskEventLoop::default();
        let mut session = SniffSession::new(Arc::clone(&self.table), &self.settings);

        session.start(&watcher, &mut event_loop, move |outcome| {
            let _ = tx.send(outcome);
        })?;

        let (Some(readable), Some(timer), Some(deadline)) =
            (event_loop.readable, event_loop.timer, event_loop.deadline)
        else {
            return Err(SnifferError::Registration("event loop returned no registrations".to_string()));
        };

        let sleep = time::sleep_until(deadline);
        tokio::pin!(sleep);

        while !session.is_decided() {
            let watching = readable.load(Ordering::Acquire);
            let timing = timer.load(Ordering::Acquire);
            if !watching && !timing {
                break;
            }

            tokio::select! {
                ready = watcher.ready(Interest::READABLE), if watching => match ready {
                    Ok(ready) if ready.is_read_closed() => {
                        session.handle(SessionEvent::PeerClosed);
                    }
                    Ok(_) => drain(&watcher, &mut session),
                    Err(e) => {
                        debug!("Waiting for readiness failed: {}", e);
                        session.handle(SessionEvent::WatchFailed(e.kind()));
                    }
                },
                () = &mut sleep, if timing => {
                    session.handle(SessionEvent::TimedOut);
                }
            }
        }

        drop(session);
        rx.try_recv()
            .map_err(|_| SnifferError::Other("sniff session ended without a decision".to_string()))
    }
}

/// Peek until the socket has nothing new
///
/// Tokio keeps a socket readable until an operation reports would-block,
/// and a peek never drains the queue. Reporting would-block for a stalled
/// peek clears the watcher's readiness, so the next wake-up only happens
/// when new bytes arrive.
fn drain(watcher: &TcpStream, session: &mut SniffSession<'_, TcpStream>) {
    let _ = watcher.try_io(Interest::READABLE, || match session.on_readable() {
        ReadProgress::Stalled => Err(io::ErrorKind::WouldBlock.into()),
        _ => Ok(()),
    });
}
