//! Core runtime components.
//!
//! This module contains the dispatch loop and everything it schedules:
//! - the [`Runtime`] and its [`RuntimeBuilder`],
//! - the per-thread context that free functions use to find the runtime,
//! - the ready queue and the task arena,
//! - cooperative yielding and shutdown.
//!
//! Most users will interact with higher-level APIs built on top of
//! these components rather than using this module directly.

mod core;
mod handle;
mod queue;
mod shutdown;

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod yield_now;

pub mod task;

pub use self::core::Runtime;
pub use builder::RuntimeBuilder;
pub use handle::Handle;
pub use shutdown::ShutdownHandle;
