use crate::runtime::task::TaskId;

use std::os::fd::RawFd;

/// One registration: the waiting task and the ticket identifying it.
///
/// Tickets are unique for the lifetime of a runtime. A resume payload
/// carries the ticket of the registration it answers, so a payload left
/// over from a finished wait never completes a newer wait that reuses the
/// same descriptor number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Waiter {
    pub(crate) task: TaskId,
    pub(crate) seq: u64,
}

/// Maps each file descriptor to the task waiting on it.
///
/// The table is a dense vector indexed by descriptor number, sized up front
/// and grown on demand. Each descriptor has at most one waiter: registering
/// again replaces the previous one.
pub(crate) struct WaiterTable {
    slots: Vec<Option<Waiter>>,
    next_seq: u64,
}

impl WaiterTable {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            next_seq: 0,
        }
    }

    /// Issues a fresh registration ticket.
    pub(crate) fn ticket(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Records `task` as the waiter of `fd` under a fresh ticket.
    ///
    /// Returns the new waiter and the one it replaced. Negative descriptors
    /// are not recorded.
    pub(crate) fn set(&mut self, fd: RawFd, task: TaskId) -> (Waiter, Option<Waiter>) {
        let waiter = Waiter {
            task,
            seq: self.ticket(),
        };

        let Some(index) = index(fd) else {
            return (waiter, None);
        };

        if index >= self.slots.len() {
            let len = (index + 1).max(self.slots.len() * 2);
            self.slots.resize(len, None);
        }

        (waiter, self.slots[index].replace(waiter))
    }

    /// Forgets the waiter of `fd`.
    pub(crate) fn clear(&mut self, fd: RawFd) {
        if let Some(slot) = self.slot_mut(fd) {
            *slot = None;
        }
    }

    /// Forgets the waiter of `fd` only if it still holds ticket `seq`.
    ///
    /// Returns `true` when an entry was removed.
    pub(crate) fn clear_if(&mut self, fd: RawFd, seq: u64) -> bool {
        match self.slot_mut(fd) {
            Some(slot) if slot.is_some_and(|waiter| waiter.seq == seq) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Removes and returns the waiter of `fd`.
    pub(crate) fn take(&mut self, fd: RawFd) -> Option<Waiter> {
        self.slot_mut(fd)?.take()
    }

    fn slot_mut(&mut self, fd: RawFd) -> Option<&mut Option<Waiter>> {
        self.slots.get_mut(index(fd)?)
    }
}

fn index(fd: RawFd) -> Option<usize> {
    usize::try_from(fd).ok()
}
