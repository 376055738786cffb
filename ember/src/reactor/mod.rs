//! Readiness plumbing between the kernel and tasks.
//!
//! This module owns everything that turns descriptor readiness into task
//! resumptions:
//! - the `epoll` poller and its raw syscall wrappers,
//! - the waiter table mapping descriptors to the task waiting on them,
//! - timer and signal descriptors,
//! - the leaf futures ([`wait`], [`wait_multi`]) that suspend a task on a
//!   descriptor.
//!
//! The dispatch loop in `runtime` drives it; higher-level primitives such as
//! sockets and sleeps are built on the leaf futures.

mod event;
mod future;
mod signal;
mod timer;
mod waiters;

pub(crate) mod poller;

pub(crate) use event::Event;
pub(crate) use signal::SignalFd;
pub(crate) use waiters::WaiterTable;

pub use future::{Readiness, ReadinessAny, wait, wait_multi};
pub use poller::{Interest, Ready};
pub use timer::Timer;
