use libc::{EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLOUT};
use std::fmt;
use std::io;
use std::ops::{BitOr, BitOrAssign};
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};

use super::platform::{sys_close, sys_eventfd, sys_read, sys_write};

/// Readiness a task asks to be woken for.
///
/// `Interest` is a small bit set over the `epoll` event flags. Values are
/// combined with `|`:
///
/// ```rust,ignore
/// use ember::io::Interest;
///
/// let interest = Interest::READABLE | Interest::WRITABLE;
/// assert!(interest.contains(Interest::WRITABLE));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interest(u32);

impl Interest {
    pub const READABLE: Interest = Interest(EPOLLIN as u32);
    pub const WRITABLE: Interest = Interest(EPOLLOUT as u32);
    pub const ERROR: Interest = Interest(EPOLLERR as u32);
    pub const HANGUP: Interest = Interest(EPOLLHUP as u32);

    /// Returns `true` if every flag of `other` is set in `self`.
    pub const fn contains(self, other: Interest) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw `epoll` event bits.
    pub(crate) const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for Interest {
    type Output = Interest;

    fn bitor(self, rhs: Interest) -> Interest {
        Interest(self.0 | rhs.0)
    }
}

impl BitOrAssign for Interest {
    fn bitor_assign(&mut self, rhs: Interest) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_flags(f, self.0)
    }
}

/// Readiness reported by the multiplexer when a task is resumed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Ready(u32);

impl Ready {
    pub const EMPTY: Ready = Ready(0);
    pub const READABLE: Ready = Ready(EPOLLIN as u32);
    pub const WRITABLE: Ready = Ready(EPOLLOUT as u32);
    pub const ERROR: Ready = Ready(EPOLLERR as u32);
    pub const HANGUP: Ready = Ready(EPOLLHUP as u32);

    pub(crate) const fn from_epoll(bits: u32) -> Self {
        Ready(bits & (EPOLLIN | EPOLLOUT | EPOLLERR | EPOLLHUP) as u32)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn is_readable(self) -> bool {
        self.0 & Self::READABLE.0 != 0
    }

    pub const fn is_writable(self) -> bool {
        self.0 & Self::WRITABLE.0 != 0
    }

    pub const fn is_error(self) -> bool {
        self.0 & Self::ERROR.0 != 0
    }

    pub const fn is_hangup(self) -> bool {
        self.0 & Self::HANGUP.0 != 0
    }

    /// Returns `true` if any readiness flag matches the given interest.
    pub const fn satisfies(self, interest: Interest) -> bool {
        self.0 & interest.0 != 0
    }
}

impl BitOr for Ready {
    type Output = Ready;

    fn bitor(self, rhs: Ready) -> Ready {
        Ready(self.0 | rhs.0)
    }
}

impl fmt::Debug for Ready {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_flags(f, self.0)
    }
}

fn write_flags(f: &mut fmt::Formatter<'_>, bits: u32) -> fmt::Result {
    const NAMES: [(i32, &str); 4] = [
        (EPOLLIN, "READABLE"),
        (EPOLLOUT, "WRITABLE"),
        (EPOLLERR, "ERROR"),
        (EPOLLHUP, "HANGUP"),
    ];

    let mut first = true;
    for (flag, name) in NAMES {
        if bits & flag as u32 != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            first = false;
        }
    }

    if first {
        f.write_str("(empty)")?;
    }

    Ok(())
}

/// Source of a readiness event returned by the poller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    /// A user file descriptor registered through the waiter table.
    Fd(RawFd),

    /// The internal notifier was signalled (foreign waker or shutdown).
    Notify,

    /// A watched process signal was delivered.
    Signal(i32),
}

/// Cross-thread wake-up source backed by an `eventfd`.
///
/// Writing to the eventfd makes a blocking `epoll_wait()` return. The
/// `pending` flag collapses bursts of notifications into a single write
/// until the dispatch loop drains it.
pub(crate) struct Notifier {
    fd: RawFd,
    pending: AtomicBool,
}

impl Notifier {
    pub(crate) fn new() -> io::Result<Self> {
        Ok(Self {
            fd: sys_eventfd()?,
            pending: AtomicBool::new(false),
        })
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.fd
    }

    /// Wakes the poller. Safe to call from any thread.
    pub(crate) fn notify(&self) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            let _ = sys_write(self.fd, &1u64.to_ne_bytes());
        }
    }

    /// Resets the eventfd counter.
    ///
    /// The counter is read before the flag is cleared: a notification racing
    /// with the drain either sees `pending == true` (and its queued work is
    /// picked up by the caller right after) or writes the eventfd again.
    pub(crate) fn drain(&self) {
        let mut buf = [0u8; 8];
        let _ = sys_read(self.fd, &mut buf);
        self.pending.store(false, Ordering::Release);
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        let _ = sys_close(self.fd);
    }
}
