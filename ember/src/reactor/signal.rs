use crate::reactor::poller::platform::{sys_read_signal, sys_signalfd};

use libc::c_int;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Process signals delivered through a `signalfd`.
///
/// Creating a `SignalFd` blocks the listed signals on the calling thread so
/// they are queued for the descriptor instead of running their default
/// disposition. The mask is left in place when the descriptor is dropped.
pub(crate) struct SignalFd {
    fd: OwnedFd,
}

impl SignalFd {
    pub(crate) fn new(signals: &[c_int]) -> io::Result<Self> {
        let fd = sys_signalfd(signals)?;

        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        })
    }

    /// Returns the next pending signal number, if any.
    pub(crate) fn read(&self) -> io::Result<Option<c_int>> {
        sys_read_signal(self.fd.as_raw_fd())
    }
}

impl AsRawFd for SignalFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
