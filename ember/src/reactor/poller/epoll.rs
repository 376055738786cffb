//! Linux `epoll`-based poller implementation.
//!
//! Responsibilities:
//! - Register file descriptors for read/write/error/hangup interest
//! - Block waiting for I/O readiness or a timeout
//! - Wake the dispatch loop when foreign wakers or shutdown fire
//! - Report delivered process signals from an optional `signalfd`
//!
//! Registrations are one-shot by convention: the dispatch loop unregisters a
//! descriptor as soon as it has reported an event for it.

use super::common::{Interest, Notifier, Ready, Token};
use super::platform::sys_epoll_create;
use crate::reactor::signal::SignalFd;

use libc::{
    EBADF, EEXIST, ENOENT, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLIN, epoll_ctl,
    epoll_event, epoll_wait,
};
use log::{trace, warn};
use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::sync::Arc;
use std::time::Duration;

/// Reserved token for the internal notifier `eventfd`.
///
/// User descriptors are registered with their own fd number as token, which
/// is never negative, so the top of the `u64` range is free.
const WAKE_TOKEN: u64 = u64::MAX;

/// Reserved token for the `signalfd`.
const SIGNAL_TOKEN: u64 = u64::MAX - 1;

/// Linux `epoll` poller.
///
/// This poller owns:
/// - an `epoll` instance,
/// - a reusable event buffer,
/// - the notifier shared with foreign wakers and shutdown handles,
/// - an optional `signalfd`.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor, closed on drop.
    epoll: OwnedFd,

    /// Reusable buffer for raw epoll events.
    events: Vec<epoll_event>,

    /// Wake-up source, permanently registered under [`WAKE_TOKEN`].
    notifier: Arc<Notifier>,

    /// Signals that request shutdown, registered under [`SIGNAL_TOKEN`].
    signals: Option<SignalFd>,
}

impl EpollPoller {
    /// Creates a poller returning at most `capacity` events per call.
    pub(crate) fn new(capacity: usize) -> io::Result<Self> {
        let epoll = sys_epoll_create()?;
        let notifier = Arc::new(Notifier::new()?);

        let poller = Self {
            epoll,
            events: Vec::with_capacity(capacity),
            notifier,
            signals: None,
        };

        poller.ctl(EPOLL_CTL_ADD, poller.notifier.fd(), EPOLLIN as u32, WAKE_TOKEN)?;

        Ok(poller)
    }

    /// Returns the notifier that interrupts a blocking [`poll`](Self::poll).
    pub(crate) fn notifier(&self) -> Arc<Notifier> {
        self.notifier.clone()
    }

    /// Starts watching a `signalfd`. Each delivered signal is reported as
    /// [`Token::Signal`].
    pub(crate) fn attach_signals(&mut self, signals: SignalFd) -> io::Result<()> {
        self.ctl(EPOLL_CTL_ADD, signals.as_raw_fd(), EPOLLIN as u32, SIGNAL_TOKEN)?;
        self.signals = Some(signals);

        Ok(())
    }

    /// Registers `fd` for `interest`.
    ///
    /// If the descriptor is already registered its interest is replaced.
    pub(crate) fn register(&self, fd: RawFd, interest: Interest) -> io::Result<()> {
        match self.ctl(EPOLL_CTL_ADD, fd, interest.bits(), fd as u64) {
            Err(e) if e.raw_os_error() == Some(EEXIST) => {
                self.ctl(EPOLL_CTL_MOD, fd, interest.bits(), fd as u64)
            }
            other => other,
        }
    }

    /// Removes `fd` from the interest set.
    ///
    /// Descriptors that were never registered, or were already closed, are
    /// ignored.
    pub(crate) fn unregister(&self, fd: RawFd) {
        let rc = unsafe {
            epoll_ctl(
                self.epoll.as_raw_fd(),
                EPOLL_CTL_DEL,
                fd,
                std::ptr::null_mut(),
            )
        };

        if rc < 0 {
            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(ENOENT) | Some(EBADF) => trace!("unregister fd {fd}: {err}"),
                _ => warn!("failed to unregister fd {fd}: {err}"),
            }
        }
    }

    /// Waits for readiness events.
    ///
    /// `None` blocks until at least one event arrives. `Some(ZERO)` only
    /// checks. Other timeouts are rounded up to whole milliseconds so that a
    /// short timeout never turns into a busy loop. An interrupted wait
    /// returns an empty batch.
    pub(crate) fn poll(
        &mut self,
        out: &mut Vec<(Token, Ready)>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        out.clear();

        let timeout_ms = timeout.map(timeout_millis).unwrap_or(-1);

        self.events.clear();
        let n = unsafe {
            epoll_wait(
                self.epoll.as_raw_fd(),
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            let (bits, data) = (ev.events, ev.u64);

            match data {
                WAKE_TOKEN => {
                    self.notifier.drain();
                    out.push((Token::Notify, Ready::EMPTY));
                }

                SIGNAL_TOKEN => {
                    if let Some(signals) = &self.signals {
                        while let Some(signal) = signals.read()? {
                            out.push((Token::Signal(signal), Ready::EMPTY));
                        }
                    }
                }

                fd => out.push((Token::Fd(fd as RawFd), Ready::from_epoll(bits))),
            }
        }

        Ok(())
    }

    fn ctl(&self, op: i32, fd: RawFd, events: u32, token: u64) -> io::Result<()> {
        let mut event = epoll_event { events, u64: token };

        let rc = unsafe { epoll_ctl(self.epoll.as_raw_fd(), op, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

/// Converts a poll timeout into the `epoll_wait` millisecond argument.
fn timeout_millis(timeout: Duration) -> i32 {
    let millis = timeout.as_nanos().div_ceil(1_000_000);
    millis.min(i32::MAX as u128) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::poller::platform::{sys_close, sys_write};

    fn pipe() -> (RawFd, RawFd) {
        let mut fds = [0; 2];
        let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) };
        assert_eq!(rc, 0);
        (fds[0], fds[1])
    }

    #[test]
    fn timeouts_round_up_to_whole_millis() {
        assert_eq!(timeout_millis(Duration::ZERO), 0);
        assert_eq!(timeout_millis(Duration::from_micros(1)), 1);
        assert_eq!(timeout_millis(Duration::from_millis(3)), 3);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), i32::MAX);
    }

    #[test]
    fn reports_readable_pipe() {
        let mut poller = EpollPoller::new(8).unwrap();
        let (r, w) = pipe();

        poller.register(r, Interest::READABLE).unwrap();
        sys_write(w, b"x").unwrap();

        let mut out = Vec::new();
        poller.poll(&mut out, Some(Duration::from_secs(1))).unwrap();

        assert_eq!(out, vec![(Token::Fd(r), Ready::READABLE)]);

        poller.unregister(r);
        sys_close(r).unwrap();
        sys_close(w).unwrap();
    }

    #[test]
    fn second_registration_replaces_interest() {
        let mut poller = EpollPoller::new(8).unwrap();
        let (r, w) = pipe();

        poller.register(w, Interest::READABLE).unwrap();
        poller.register(w, Interest::WRITABLE).unwrap();

        let mut out = Vec::new();
        poller.poll(&mut out, Some(Duration::ZERO)).unwrap();

        assert_eq!(out, vec![(Token::Fd(w), Ready::WRITABLE)]);

        sys_close(r).unwrap();
        sys_close(w).unwrap();
    }

    #[test]
    fn notifier_interrupts_blocking_poll() {
        let mut poller = EpollPoller::new(8).unwrap();
        let notifier = poller.notifier();

        let thread = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            notifier.notify();
        });

        let mut out = Vec::new();
        poller.poll(&mut out, None).unwrap();
        thread.join().unwrap();

        assert_eq!(out, vec![(Token::Notify, Ready::EMPTY)]);
    }

    #[test]
    fn unregister_unknown_fd_is_ignored() {
        let poller = EpollPoller::new(8).unwrap();
        poller.unregister(12345);
    }
}
