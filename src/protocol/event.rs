//! Socket and event-loop seams used by the sniff session
//!
//! The session never blocks and never polls on its own. It asks an
//! [`EventLoop`] for a readiness watch and a timer, then reacts to the
//! [`SessionEvent`] messages the loop delivers. Reads go through
//! [`PeekSocket`], which must leave the peeked bytes in the socket's receive
//! queue for whoever reads the connection next.

use std::io;
use std::mem::MaybeUninit;
use std::time::Duration;

use socket2::SockRef;

use crate::common::Result;

/// Non-blocking, non-destructive read primitive
pub trait PeekSocket {
    /// Copy queued bytes into `buf` without removing them from the socket
    ///
    /// Returns the number of bytes copied, counted from the start of the
    /// receive queue. `io::ErrorKind::WouldBlock` signals that nothing is
    /// queued yet.
    fn peek(&self, buf: &mut [u8]) -> io::Result<usize>;
}

fn peek_socket(socket: SockRef<'_>, buf: &mut [u8]) -> io::Result<usize> {
    // SAFETY: `buf` is fully initialized, and recv(2) only ever writes
    // initialized bytes into the slice it is given.
    let uninit = unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) };
    socket.peek(uninit)
}

impl PeekSocket for tokio::net::TcpStream {
    fn peek(&self, buf: &mut [u8]) -> io::Result<usize> {
        peek_socket(SockRef::from(self), buf)
    }
}

/// The std stream must be in non-blocking mode for would-block to surface.
impl PeekSocket for std::net::TcpStream {
    fn peek(&self, buf: &mut [u8]) -> io::Result<usize> {
        peek_socket(SockRef::from(self), buf)
    }
}

/// A live readiness watch or timer
pub trait Registration: Send {
    /// Stop delivering events for this registration; idempotent
    fn cancel(&mut self);

    /// Whether events may still be delivered
    fn is_active(&self) -> bool;
}

/// Source of readiness and timeout events for one connection
pub trait EventLoop {
    /// Watch the connection's socket for read-readiness and peer close
    ///
    /// The watch is edge-triggered: one notification per arrival of new
    /// data, after which the consumer must read until it would block.
    fn watch_readable(&mut self) -> Result<Box<dyn Registration>>;

    /// Arm a one-shot timer that fires [`SessionEvent::TimedOut`] after `timeout`
    fn arm_timer(&mut self, timeout: Duration) -> Result<Box<dyn Registration>>;
}

/// Event delivered to a session by its event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// New data may be readable
    Readable,
    /// The peer closed its side of the connection
    PeerClosed,
    /// The detection timer fired
    TimedOut,
    /// Waiting for readiness itself failed
    WatchFailed(io::ErrorKind),
}
