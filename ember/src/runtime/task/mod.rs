//! Asynchronous task primitives.
//!
//! A task is a boxed future stored in the runtime's arena and addressed by a
//! [`TaskId`]. It suspends by returning `Poll::Pending` and is resumed only
//! by the dispatch loop, either because it was queued or because a
//! descriptor it waits on became ready.
//!
//! Most users will interact with this module through [`spawn`],
//! [`spawn_after`] and [`JoinHandle`].

mod core;
mod handle;

pub(crate) mod waker;

pub(crate) use self::core::{BoxFuture, Task, TaskId, joinable};

pub use self::core::{spawn, spawn_after};
pub use handle::JoinHandle;
