use crate::reactor::poller::Notifier;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown flag shared by a runtime and its [`ShutdownHandle`]s.
pub(crate) struct ShutdownState {
    requested: AtomicBool,
    notifier: Arc<Notifier>,
}

impl ShutdownState {
    pub(crate) fn new(notifier: Arc<Notifier>) -> Self {
        Self {
            requested: AtomicBool::new(false),
            notifier,
        }
    }

    pub(crate) fn request(&self) {
        if !self.requested.swap(true, Ordering::AcqRel) {
            self.notifier.notify();
        }
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Requests that a runtime stop.
///
/// The handle is `Send + Sync` and can be used from any thread, including
/// from inside a task of the runtime it stops. Once shutdown is requested the
/// dispatch loop stops before resuming anything else: the root future is
/// dropped and [`block_on`](crate::Runtime::block_on) returns
/// [`Error::Shutdown`](crate::Error::Shutdown). Shutdown is permanent; later
/// calls to `block_on` on the same runtime return the same error.
///
/// # Examples
///
/// ```rust,ignore
/// let runtime = RuntimeBuilder::new().build()?;
/// let shutdown = runtime.shutdown_handle();
///
/// std::thread::spawn(move || {
///     std::thread::sleep(Duration::from_secs(1));
///     shutdown.shutdown();
/// });
///
/// assert!(matches!(runtime.block_on(serve()), Err(Error::Shutdown)));
/// ```
#[derive(Clone)]
pub struct ShutdownHandle {
    pub(crate) state: Arc<ShutdownState>,
}

impl ShutdownHandle {
    /// Requests shutdown and wakes the dispatch loop if it is blocked.
    pub fn shutdown(&self) {
        self.state.request();
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.state.is_requested()
    }
}
