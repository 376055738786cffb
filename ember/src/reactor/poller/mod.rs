//! Readiness multiplexer.
//!
//! This module wraps the kernel readiness facility used by the dispatch loop.
//! Only Linux is supported: the backend is `epoll`, with `eventfd` for
//! cross-thread wake-ups and `signalfd` for shutdown signals.
//!
//! All raw syscalls live in [`platform`] and return `io::Result`.

pub(crate) mod common;

pub use common::{Interest, Ready};
pub(crate) use common::{Notifier, Token};

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(target_os = "linux")]
pub(crate) mod unix;

#[cfg(target_os = "linux")]
pub(crate) use unix as platform;

#[cfg(not(target_os = "linux"))]
compile_error!("ember requires Linux (epoll, timerfd, eventfd and signalfd)");
