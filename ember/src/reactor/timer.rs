use crate::reactor::poller::platform::sys_timerfd;

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

/// A one-shot countdown exposed as a file descriptor.
///
/// The descriptor becomes readable once the duration has elapsed on the
/// monotonic clock, so a timer can be awaited like any other descriptor:
///
/// ```rust,ignore
/// use ember::io::{Interest, Timer, wait};
/// use std::os::fd::AsRawFd;
///
/// let timer = Timer::after(Duration::from_millis(10))?;
/// wait(timer.as_raw_fd(), Interest::READABLE).await?;
/// ```
///
/// The descriptor is closed when the timer is dropped.
#[derive(Debug)]
pub struct Timer {
    fd: OwnedFd,
}

impl Timer {
    /// Arms a timer that expires after `duration`.
    ///
    /// A zero duration expires on the next poll.
    pub fn after(duration: Duration) -> io::Result<Self> {
        let fd = sys_timerfd(duration)?;

        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        })
    }
}

impl AsRawFd for Timer {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
