use crate::reactor::poller::Notifier;
use crate::runtime::task::TaskId;

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::Wake;

/// Wake-ups coming from outside the dispatch loop.
///
/// Standard [`Waker`](std::task::Waker)s may be cloned into foreign futures
/// and fired from any thread, so they cannot touch the runtime directly.
/// They push the task id here and signal the poller instead; the dispatch
/// loop moves the ids into the ready queue at the start of each tick.
pub(crate) struct Remote {
    queue: Mutex<Vec<TaskId>>,
    notifier: Arc<Notifier>,
}

impl Remote {
    pub(crate) fn new(notifier: Arc<Notifier>) -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            notifier,
        }
    }

    pub(crate) fn push(&self, task: TaskId) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);

        self.notifier.notify();
    }

    /// Takes every pending wake-up, in arrival order.
    pub(crate) fn take(&self) -> Vec<TaskId> {
        mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// The waker handed to a task when it is polled.
pub(crate) struct TaskWaker {
    task: TaskId,
    remote: Arc<Remote>,
}

impl TaskWaker {
    pub(crate) fn new(task: TaskId, remote: Arc<Remote>) -> Self {
        Self { task, remote }
    }
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.remote.push(self.task);
    }
}
