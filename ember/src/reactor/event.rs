use super::poller::Ready;

use std::os::fd::RawFd;

/// Resume payload delivered to a task.
///
/// When the dispatch loop resumes a task because one of its descriptors
/// became ready, the descriptor, the reported readiness and the ticket of
/// the registration are installed in the task context for the duration of
/// the poll. Leaf futures claim only the payload carrying their own ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Event {
    /// Descriptor that fired, `-1` for a self-scheduled yield.
    pub(crate) fd: RawFd,

    /// Readiness reported by the poller.
    pub(crate) ready: Ready,

    /// Ticket of the registration this payload answers.
    pub(crate) seq: u64,
}
