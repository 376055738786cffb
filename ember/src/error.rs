use std::io;
use thiserror::Error;

/// Errors reported by the runtime itself.
///
/// Socket and descriptor operations report `std::io::Error` directly; this
/// type only covers building and driving the runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// The poller, notifier or signal descriptor could not be created.
    #[error("failed to initialize runtime: {0}")]
    Init(#[source] io::Error),

    /// Waiting for readiness failed.
    #[error("failed to poll for readiness: {0}")]
    Poll(#[source] io::Error),

    /// Shutdown was requested before the root future completed.
    #[error("runtime was shut down")]
    Shutdown,
}

/// Result alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
