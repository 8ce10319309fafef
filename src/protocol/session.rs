//! Sniff session state machine
//!
//! One session owns the detection lifecycle of one connection:
//!
//! ```text
//! Idle --start--> AwaitingData --finish--> Decided
//! ```
//!
//! `Decided` is absorbing. Registrations are cancelled before the completion
//! callback runs, and every event that reaches a decided session is ignored,
//! so the recorded outcome can never change once set.

use log::{debug, trace};
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::common::{SnifferError, Result};
use super::buffer::PeekBuffer;
use super::event::{EventLoop, PeekSocket, Registration, SessionEvent};
use super::signature::SignatureTable;

/// Default detection timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Default peek buffer capacity (64 KiB)
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Detection parameters shared by every session of a sniffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffSettings {
    /// How long detection may take before the connection proceeds undetected
    pub timeout: Duration,
    /// Peek buffer capacity; a full buffer without a match ends detection
    pub buffer_capacity: usize,
}

impl Default for SniffSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Why a session failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The peer closed the connection before detection finished
    ConnectionClosed,
    /// Peeking the socket failed with something other than would-block
    ReadError(io::ErrorKind),
    /// The pipeline cancelled the session
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::ReadError(kind) => write!(f, "read error: {}", kind),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal decision of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Protocols detected, in signature registration order
    Matched(Vec<String>),
    /// No protocol recognised (timeout or full buffer)
    Unmatched,
    /// Detection could not complete
    Failed(FailureReason),
}

impl Outcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    /// Detected protocols; empty unless matched
    pub fn protocols(&self) -> &[String] {
        match self {
            Self::Matched(protocols) => protocols,
            _ => &[],
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched(protocols) => write!(f, "matched [{}]", protocols.join(", ")),
            Self::Unmatched => write!(f, "unmatched"),
            Self::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingData,
    Decided,
}

/// What handling one event achieved
///
/// Event loops use this to decide whether the socket's readiness has been
/// drained: only `Stalled` means the last peek saw nothing new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadProgress {
    /// Nothing new to read; wait for the next readiness edge
    Stalled,
    /// New bytes arrived but did not decide the session
    Pending,
    /// The event decided the session
    Decided,
    /// The session was not awaiting data; the event had no effect
    Ignored,
}

/// Completion callback, invoked at most once
pub type CompletionCallback<'a> = Box<dyn FnOnce(Outcome) + Send + 'a>;

/// Protocol detection for a single connection
///
/// The session borrows the socket; the pipeline keeps ownership and must
/// keep it alive until the session is decided or dropped.
pub struct SniffSession<'a, S: PeekSocket + ?Sized> {
    table: Arc<SignatureTable>,
    timeout: Duration,
    buffer: PeekBuffer,
    state: SessionState,
    socket: Option<&'a S>,
    readiness: Option<Box<dyn Registration>>,
    timer: Option<Box<dyn Registration>>,
    on_complete: Option<CompletionCallback<'a>>,
    outcome: Option<Outcome>,
}

impl<'a, S: PeekSocket + ?Sized> SniffSession<'a, S> {
    /// Create an idle session with its own peek buffer
    ///
    /// A zero capacity is raised to one byte; an empty buffer could never
    /// fill and would always wait for the timeout.
    pub fn new(table: Arc<SignatureTable>, settings: &SniffSettings) -> Self {
        Self {
            table,
            timeout: settings.timeout,
            buffer: PeekBuffer::with_capacity(settings.buffer_capacity.max(1)),
            state: SessionState::Idle,
            socket: None,
            readiness: None,
            timer: None,
            on_complete: None,
            outcome: None,
        }
    }

    /// Begin detection on `socket`
    ///
    /// Registers an edge-triggered readiness watch and arms the detection
    /// timer. `on_complete` is invoked exactly once when the session decides,
    /// unless the session is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns `SnifferError::Registration` if the session was already
    /// started or if either registration fails. In that case nothing stays
    /// registered and `on_complete` is never called.
    pub fn start<F>(&mut self, socket: &'a S, event_loop: &mut dyn EventLoop, on_complete: F) -> Result<()>
    where
        F: FnOnce(Outcome) + Send + 'a,
    {
        if self.state != SessionState::Idle {
            return Err(SnifferError::Registration(format!(
                "session already started (state {:?})",
                self.state
            )));
        }

        let readiness = event_loop.watch_readable()?;
        let timer = match event_loop.arm_timer(self.timeout) {
            Ok(timer) => timer,
            Err(e) => {
                let mut readiness = readiness;
                readiness.cancel();
                return Err(e);
            }
        };

        self.socket = Some(socket);
        self.readiness = Some(readiness);
        self.timer = Some(timer);
        self.on_complete = Some(Box::new(on_complete));
        self.state = SessionState::AwaitingData;

        trace!("Sniff session started, timeout {} ms", self.timeout.as_millis());
        Ok(())
    }

    /// Handle one event from the event loop
    pub fn handle(&mut self, event: SessionEvent) -> ReadProgress {
        match event {
            SessionEvent::Readable => self.on_readable(),
            SessionEvent::PeerClosed => self.on_peer_closed(),
            SessionEvent::TimedOut => self.on_timeout(),
            SessionEvent::WatchFailed(kind) => {
                self.finish_if_awaiting(Outcome::Failed(FailureReason::ReadError(kind)))
            }
        }
    }

    /// Peek the socket and re-run detection over everything received so far
    pub fn on_readable(&mut self) -> ReadProgress {
        if self.state != SessionState::AwaitingData {
            return ReadProgress::Ignored;
        }

        let Some(socket) = self.socket else {
            return ReadProgress::Ignored;
        };

        let n = loop {
            match socket.peek(self.buffer.as_mut_slice()) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return ReadProgress::Stalled,
                Err(e) => {
                    debug!("Peek failed: {}", e);
                    self.finish(Outcome::Failed(FailureReason::ReadError(e.kind())));
                    return ReadProgress::Decided;
                }
            }
        };

        if !self.buffer.record(n) {
            return ReadProgress::Stalled;
        }

        trace!("Peeked {} bytes", self.buffer.read_count());

        let detected = self.table.detect(self.buffer.filled());
        if !detected.is_empty() {
            let protocols = detected.into_iter().map(str::to_owned).collect();
            self.finish(Outcome::Matched(protocols));
            return ReadProgress::Decided;
        }

        if self.buffer.is_full() {
            debug!("Peek buffer full ({} bytes) without a match", self.buffer.capacity());
            self.finish(Outcome::Unmatched);
            return ReadProgress::Decided;
        }

        ReadProgress::Pending
    }

    /// The peer closed the connection
    pub fn on_peer_closed(&mut self) -> ReadProgress {
        self.finish_if_awaiting(Outcome::Failed(FailureReason::ConnectionClosed))
    }

    /// The detection timer fired; detection gives up and fails open
    pub fn on_timeout(&mut self) -> ReadProgress {
        if self.state == SessionState::AwaitingData {
            debug!("Protocol detection timed out after {} bytes", self.buffer.read_count());
        }
        self.finish_if_awaiting(Outcome::Unmatched)
    }

    /// Abandon detection without invoking the completion callback
    pub fn cancel(&mut self) {
        if self.state == SessionState::Decided {
            return;
        }
        self.release_registrations();
        self.on_complete = None;
        self.outcome = Some(Outcome::Failed(FailureReason::Cancelled));
        self.state = SessionState::Decided;
        trace!("Sniff session cancelled");
    }

    fn finish_if_awaiting(&mut self, outcome: Outcome) -> ReadProgress {
        if self.state != SessionState::AwaitingData {
            return ReadProgress::Ignored;
        }
        self.finish(outcome);
        ReadProgress::Decided
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.state == SessionState::Decided {
            return;
        }

        self.release_registrations();
        self.state = SessionState::Decided;
        self.outcome = Some(outcome.clone());
        debug!("Protocol detection {}", outcome);

        if let Some(on_complete) = self.on_complete.take() {
            on_complete(outcome);
        }
    }

    fn release_registrations(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
        if let Some(mut readiness) = self.readiness.take() {
            readiness.cancel();
        }
        self.socket = None;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_decided(&self) -> bool {
        self.state == SessionState::Decided
    }

    /// The recorded decision, once decided
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn read_count(&self) -> usize {
        self.buffer.read_count()
    }
}

impl<S: PeekSocket + ?Sized> Drop for SniffSession<'_, S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<S: PeekSocket + ?Sized> fmt::Debug for SniffSession<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SniffSession")
            .field("state", &self.state)
            .field("read_count", &self.buffer.read_count())
            .field("capacity", &self.buffer.capacity())
            .field("outcome", &self.outcome)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::Sequence;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    mock! {
        Socket {}

        impl PeekSocket for Socket {
            fn peek(&self, buf: &mut [u8]) -> io::Result<usize>;
        }
    }

    struct FakeRegistration(Arc<AtomicBool>);

    impl Registration for FakeRegistration {
        fn cancel(&mut self) {
            self.0.store(false, Ordering::SeqCst);
        }

        fn is_active(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Records registrations so tests can check they were released
    struct FakeEventLoop {
        readable: Arc<AtomicBool>,
        timer: Arc<AtomicBool>,
        timeout: Option<Duration>,
        fail_timer: bool,
    }

    impl Default for FakeEventLoop {
        fn default() -> Self {
            Self {
                readable: Arc::new(AtomicBool::new(false)),
                timer: Arc::new(AtomicBool::new(false)),
                timeout: None,
                fail_timer: false,
            }
        }
    }

    impl FakeEventLoop {
        fn readable_active(&self) -> bool {
            self.readable.load(Ordering::SeqCst)
        }

        fn timer_active(&self) -> bool {
            self.timer.load(Ordering::SeqCst)
        }
    }

    impl EventLoop for FakeEventLoop {
        fn watch_readable(&mut self) -> Result<Box<dyn Registration>> {
            self.readable.store(true, Ordering::SeqCst);
            Ok(Box::new(FakeRegistration(Arc::clone(&self.readable))))
        }

        fn arm_timer(&mut self, timeout: Duration) -> Result<Box<dyn Registration>> {
            if self.fail_timer {
                return Err(SnifferError::Registration("timer unavailable".to_string()));
            }
            self.timer.store(true, Ordering::SeqCst);
            self.timeout = Some(timeout);
            Ok(Box::new(FakeRegistration(Arc::clone(&self.timer))))
        }
    }

    fn peek_returns(socket: &mut MockSocket, seq: &mut Sequence, data: &'static [u8]) {
        socket
            .expect_peek()
            .times(1)
            .in_sequence(seq)
            .returning(move |buf| {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            });
    }

    fn settings(buffer_capacity: usize) -> SniffSettings {
        SniffSettings {
            timeout: Duration::from_millis(500),
            buffer_capacity,
        }
    }

    type Calls = Arc<Mutex<Vec<Outcome>>>;

    fn start_session<'a>(
        socket: &'a MockSocket,
        event_loop: &mut FakeEventLoop,
        settings: &SniffSettings,
    ) -> (SniffSession<'a, MockSocket>, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let mut session = SniffSession::new(Arc::new(SignatureTable::default()), settings);
        session
            .start(socket, event_loop, move |outcome| sink.lock().unwrap().push(outcome))
            .unwrap();
        (session, calls)
    }

    #[test]
    fn test_start_registers_watch_and_timer() {
        let socket = MockSocket::new();
        let mut event_loop = FakeEventLoop::default();
        let (session, calls) = start_session(&socket, &mut event_loop, &settings(64));

        assert_eq!(session.state(), SessionState::AwaitingData);
        assert!(event_loop.readable_active());
        assert!(event_loop.timer_active());
        assert_eq!(event_loop.timeout, Some(Duration::from_millis(500)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_full_request_matches_on_first_readiness() {
        let mut socket = MockSocket::new();
        let mut seq = Sequence::new();
        peek_returns(&mut socket, &mut seq, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");

        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        assert_eq!(session.handle(SessionEvent::Readable), ReadProgress::Decided);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Outcome::Matched(vec!["http/1.1".to_string()])]
        );
        assert!(!event_loop.readable_active());
        assert!(!event_loop.timer_active());
    }

    #[test]
    fn test_split_delivery_matches_on_second_peek() {
        let mut socket = MockSocket::new();
        let mut seq = Sequence::new();
        peek_returns(&mut socket, &mut seq, b"GE");
        peek_returns(&mut socket, &mut seq, b"GET / HTTP/1.1\r\n");

        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        assert_eq!(session.on_readable(), ReadProgress::Pending);
        assert_eq!(session.state(), SessionState::AwaitingData);
        assert_eq!(session.read_count(), 2);
        assert!(calls.lock().unwrap().is_empty());

        assert_eq!(session.on_readable(), ReadProgress::Decided);
        assert_eq!(
            session.outcome(),
            Some(&Outcome::Matched(vec!["http/1.1".to_string()]))
        );
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stale_peek_is_a_no_op() {
        let mut socket = MockSocket::new();
        let mut seq = Sequence::new();
        peek_returns(&mut socket, &mut seq, b"GET /");
        peek_returns(&mut socket, &mut seq, b"GET /");

        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        assert_eq!(session.on_readable(), ReadProgress::Pending);
        assert_eq!(session.on_readable(), ReadProgress::Stalled);
        assert_eq!(session.read_count(), 5);
        assert_eq!(session.state(), SessionState::AwaitingData);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_would_block_keeps_waiting() {
        let mut socket = MockSocket::new();
        socket
            .expect_peek()
            .times(1)
            .returning(|_| Err(io::Error::from(io::ErrorKind::WouldBlock)));

        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        assert_eq!(session.on_readable(), ReadProgress::Stalled);
        assert_eq!(session.state(), SessionState::AwaitingData);
        assert!(event_loop.readable_active());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_read_error_fails_session() {
        let mut socket = MockSocket::new();
        socket
            .expect_peek()
            .times(1)
            .returning(|_| Err(io::Error::from(io::ErrorKind::ConnectionReset)));

        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        assert_eq!(session.on_readable(), ReadProgress::Decided);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Outcome::Failed(FailureReason::ReadError(io::ErrorKind::ConnectionReset))]
        );
    }

    #[test]
    fn test_interrupted_peek_is_retried() {
        let mut socket = MockSocket::new();
        let mut seq = Sequence::new();
        socket
            .expect_peek()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(io::Error::from(io::ErrorKind::Interrupted)));
        peek_returns(&mut socket, &mut seq, b"GET / HTTP/1.1\r\n");

        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        assert_eq!(session.on_readable(), ReadProgress::Decided);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Outcome::Matched(vec!["http/1.1".to_string()])]
        );
    }

    #[test]
    fn test_watch_failure_fails_awaiting_session() {
        let socket = MockSocket::new();
        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        assert_eq!(
            session.handle(SessionEvent::WatchFailed(io::ErrorKind::BrokenPipe)),
            ReadProgress::Decided
        );
        assert_eq!(session.state(), SessionState::Decided);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Outcome::Failed(FailureReason::ReadError(io::ErrorKind::BrokenPipe))]
        );
        assert!(!event_loop.readable_active());
        assert!(!event_loop.timer_active());
    }

    #[test]
    fn test_zero_capacity_decides_on_first_byte() {
        let mut socket = MockSocket::new();
        let mut seq = Sequence::new();
        peek_returns(&mut socket, &mut seq, b"\x16\x03\x01");

        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(0));

        assert_eq!(session.on_readable(), ReadProgress::Decided);
        assert_eq!(session.read_count(), 1);
        assert_eq!(*calls.lock().unwrap(), vec![Outcome::Unmatched]);
    }

    #[test]
    fn test_full_buffer_without_match_is_unmatched() {
        let mut socket = MockSocket::new();
        let mut seq = Sequence::new();
        peek_returns(&mut socket, &mut seq, b"\x16\x03\x01\x02\x00\x01\x00\x01");

        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(8));

        assert_eq!(session.on_readable(), ReadProgress::Decided);
        assert_eq!(*calls.lock().unwrap(), vec![Outcome::Unmatched]);
        assert!(!event_loop.timer_active());
    }

    #[test]
    fn test_timeout_fails_open_exactly_once() {
        let socket = MockSocket::new();
        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        assert_eq!(session.handle(SessionEvent::TimedOut), ReadProgress::Decided);
        assert_eq!(session.handle(SessionEvent::TimedOut), ReadProgress::Ignored);
        assert_eq!(*calls.lock().unwrap(), vec![Outcome::Unmatched]);
    }

    #[test]
    fn test_peer_close_fails_without_reading() {
        // No peek expectation: reading would panic the mock
        let socket = MockSocket::new();
        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        assert_eq!(session.handle(SessionEvent::PeerClosed), ReadProgress::Decided);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Outcome::Failed(FailureReason::ConnectionClosed)]
        );
    }

    #[test]
    fn test_events_after_decision_do_not_change_outcome() {
        let mut socket = MockSocket::new();
        let mut seq = Sequence::new();
        peek_returns(&mut socket, &mut seq, b"GET / HTTP/1.1\r\n");

        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));
        session.on_readable();

        for event in [
            SessionEvent::Readable,
            SessionEvent::PeerClosed,
            SessionEvent::TimedOut,
            SessionEvent::WatchFailed(io::ErrorKind::Other),
        ] {
            assert_eq!(session.handle(event), ReadProgress::Ignored);
        }
        session.cancel();

        assert_eq!(
            session.outcome(),
            Some(&Outcome::Matched(vec!["http/1.1".to_string()]))
        );
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_registrations_released_before_callback() {
        let mut socket = MockSocket::new();
        let mut seq = Sequence::new();
        peek_returns(&mut socket, &mut seq, b"GET / HTTP/1.1\r\n");

        let mut event_loop = FakeEventLoop::default();
        let readable = Arc::clone(&event_loop.readable);
        let timer = Arc::clone(&event_loop.timer);
        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);

        let mut session = SniffSession::new(Arc::new(SignatureTable::default()), &settings(64));
        session
            .start(&socket, &mut event_loop, move |_| {
                *sink.lock().unwrap() = Some((
                    readable.load(Ordering::SeqCst),
                    timer.load(Ordering::SeqCst),
                ));
            })
            .unwrap();

        assert_eq!(session.on_readable(), ReadProgress::Decided);
        assert_eq!(*observed.lock().unwrap(), Some((false, false)));
    }

    #[test]
    fn test_dropping_undecided_session_releases_registrations() {
        let socket = MockSocket::new();
        let mut event_loop = FakeEventLoop::default();
        let (session, calls) = start_session(&socket, &mut event_loop, &settings(64));
        assert!(event_loop.readable_active());

        drop(session);

        assert!(!event_loop.readable_active());
        assert!(!event_loop.timer_active());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_suppresses_callback() {
        let socket = MockSocket::new();
        let mut event_loop = FakeEventLoop::default();
        let (mut session, calls) = start_session(&socket, &mut event_loop, &settings(1024));

        session.cancel();
        session.cancel();

        assert_eq!(session.outcome(), Some(&Outcome::Failed(FailureReason::Cancelled)));
        assert!(!event_loop.readable_active());
        assert!(!event_loop.timer_active());
        assert_eq!(session.handle(SessionEvent::TimedOut), ReadProgress::Ignored);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let socket = MockSocket::new();
        let mut event_loop = FakeEventLoop::default();
        let (mut session, _calls) = start_session(&socket, &mut event_loop, &settings(1024));

        let result = session.start(&socket, &mut event_loop, |_| {});
        assert!(matches!(result, Err(SnifferError::Registration(_))));
        assert_eq!(session.state(), SessionState::AwaitingData);
    }

    #[test]
    fn test_timer_failure_releases_readiness_watch() {
        let socket = MockSocket::new();
        let mut event_loop = FakeEventLoop {
            fail_timer: true,
            ..Default::default()
        };
        let mut session = SniffSession::new(Arc::new(SignatureTable::default()), &settings(64));

        let result = session.start(&socket, &mut event_loop, |_| panic!("callback must not run"));
        assert!(matches!(result, Err(SnifferError::Registration(_))));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!event_loop.readable_active());
    }

    #[test]
    fn test_events_before_start_are_ignored() {
        let socket = MockSocket::new();
        let mut session: SniffSession<'_, MockSocket> =
            SniffSession::new(Arc::new(SignatureTable::default()), &settings(64));
        assert_eq!(session.handle(SessionEvent::Readable), ReadProgress::Ignored);
        assert_eq!(session.handle(SessionEvent::TimedOut), ReadProgress::Ignored);
        assert_eq!(session.state(), SessionState::Idle);
        drop(socket);
    }
}
