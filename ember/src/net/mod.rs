//! Networking primitives.
//!
//! This module provides [`Socket`], a non-blocking TCP socket whose
//! operations suspend the calling task instead of blocking the thread.
//!
//! Sockets integrate directly with the runtime and should be used instead
//! of blocking `std::net` sockets inside tasks.

mod socket;

pub use socket::{Family, Socket};
