//! Readiness-level I/O.
//!
//! Lower-level building blocks for code that drives its own descriptors:
//! suspend a task until a descriptor is ready with [`wait`] or
//! [`wait_multi`], and create timer descriptors with [`Timer`].
//!
//! Descriptors passed to these functions **must** be non-blocking.

pub use crate::reactor::{Interest, Readiness, ReadinessAny, Ready, Timer, wait, wait_multi};
