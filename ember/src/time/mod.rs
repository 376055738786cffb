//! Time utilities.
//!
//! This module provides timer-based asynchronous utilities backed by
//! `timerfd` descriptors:
//! - [`sleep`] suspends the current task for a duration,
//! - [`timeout`] bounds the execution time of a future.
//!
//! To delay the start of a whole task, see [`spawn_after`](crate::spawn_after).

mod sleep;
mod timeout;

#[doc(inline)]
pub use sleep::{Sleep, sleep};

#[doc(inline)]
pub use timeout::{Elapsed, Timeout, timeout};
