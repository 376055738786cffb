//! # Ember
//!
//! **Ember** is a minimal single-threaded cooperative runtime for Linux. It
//! lets many lightweight tasks perform blocking-looking socket I/O
//! concurrently on one OS thread, using `epoll` for readiness and `timerfd`
//! for sleeps.
//!
//! A task is a future. It suspends when an operation would block and is
//! resumed by the dispatch loop once the descriptor it waits on becomes
//! ready. There is no work stealing, no background thread and no locking
//! on the hot path: tasks only run while [`Runtime::block_on`] runs.
//!
//! Ember provides:
//!
//! - A **dispatch loop** alternating between polling `epoll` and resuming
//!   ready tasks in FIFO order
//! - **Non-blocking sockets** with an `async` API that reads like blocking
//!   code
//! - **Timer primitives**: sleep, timeout and delayed spawn
//! - **Graceful shutdown** from any thread or on process signals
//! - **Ergonomic macros**: `#[ember::main]` and `#[ember::test]`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ember::time::sleep;
//! use std::time::Duration;
//!
//! #[ember::main]
//! async fn main() {
//!     // Spawn a background task
//!     let handle = ember::spawn(async {
//!         sleep(Duration::from_millis(100)).await;
//!         println!("Task completed!");
//!     });
//!
//!     // Wait for the task to finish
//!     handle.await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`net`]: non-blocking TCP sockets
//! - [`time`]: sleep and timeout
//! - [`io`]: descriptor readiness and timer descriptors
//! - [`task`]: spawning and joining tasks

mod error;
mod reactor;
mod runtime;
mod utils;

pub mod io;
pub mod net;
pub mod time;

pub use error::{Error, Result};
pub use runtime::task;
pub use runtime::task::{spawn, spawn_after};
pub use runtime::yield_now::yield_now;
pub use runtime::{Handle, Runtime, RuntimeBuilder, ShutdownHandle};

pub use ember_macros::{main, test};
