use super::Runtime;
use crate::error::{Error, Result};
use crate::reactor::SignalFd;
use crate::reactor::poller::Poller;
use crate::reactor::poller::platform::sys_nofile_limit;

use libc::c_int;
use log::{debug, warn};

/// Default number of events returned by one poll.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Bounds on the initial waiter table size derived from `RLIMIT_NOFILE`.
/// The table grows on demand past the upper bound.
const MIN_FDS: usize = 1024;
const MAX_INITIAL_FDS: usize = 4096;

/// Builder for configuring and creating a runtime.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new()
///     .event_capacity(256)
///     .shutdown_on(&[libc::SIGINT, libc::SIGHUP])
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    /// Maximum number of readiness events handled per poll.
    event_capacity: usize,

    /// Initial size of the waiter table. `None` derives it from `RLIMIT_NOFILE`,
    /// capped so that runtimes stay cheap to build.
    max_fds: Option<usize>,

    /// Signals that request shutdown.
    signals: Vec<c_int>,
}

impl RuntimeBuilder {
    /// Creates a new `RuntimeBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_fds: None,
            signals: Vec::new(),
        }
    }

    /// Sets how many readiness events one poll can return.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "event_capacity must be > 0");

        self.event_capacity = n;
        self
    }

    /// Sets the initial size of the descriptor-to-task table.
    ///
    /// The table still grows if a larger descriptor shows up.
    pub fn max_fds(mut self, n: usize) -> Self {
        self.max_fds = Some(n);
        self
    }

    /// Requests shutdown when any of `signals` is delivered.
    ///
    /// The signals are blocked on the thread calling [`build`](Self::build)
    /// and read through a `signalfd`, so `block_on` must run on that same
    /// thread for them to be observed.
    pub fn shutdown_on(mut self, signals: &[c_int]) -> Self {
        self.signals.extend_from_slice(signals);
        self
    }

    /// Builds the runtime with the configured options.
    pub fn build(self) -> Result<Runtime> {
        let max_fds = self.max_fds.unwrap_or_else(default_max_fds);
        let mut poller = Poller::new(self.event_capacity).map_err(Error::Init)?;

        if !self.signals.is_empty() {
            let signals = SignalFd::new(&self.signals).map_err(Error::Init)?;
            poller.attach_signals(signals).map_err(Error::Init)?;
        }

        debug!(
            "runtime built: event_capacity={}, max_fds={}, shutdown signals={:?}",
            self.event_capacity, max_fds, self.signals
        );

        Ok(Runtime::new(poller, max_fds))
    }
}

impl Default for RuntimeBuilder {
    /// Creates a default `RuntimeBuilder`.
    fn default() -> Self {
        Self::new()
    }
}

fn default_max_fds() -> usize {
    match sys_nofile_limit() {
        Ok(limit) => initial_fds(limit),
        Err(err) => {
            warn!("failed to read RLIMIT_NOFILE, using {MIN_FDS}: {err}");
            MIN_FDS
        }
    }
}

/// Initial waiter table size for a descriptor limit.
fn initial_fds(limit: u64) -> usize {
    usize::try_from(limit)
        .unwrap_or(MAX_INITIAL_FDS)
        .clamp(MIN_FDS, MAX_INITIAL_FDS)
}
