use super::JoinHandle;
use super::handle::JoinState;
use super::waker::{Remote, TaskWaker};
use crate::runtime::Handle;
use crate::runtime::context;
use crate::utils::Key;

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::Waker;
use std::time::Duration;

/// Type-erased future stored in the task arena.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = ()>>>;

/// Identity of a task.
///
/// Ids are arena keys: once a task completes its id goes stale and never
/// addresses a newer task stored in the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TaskId(Key);

impl TaskId {
    /// Reserved id of the future passed to `block_on`. It lives on the
    /// `block_on` stack and is never stored in the arena.
    pub(crate) const ROOT: TaskId = TaskId(Key {
        index: usize::MAX,
        generation: 0,
    });

    pub(crate) const fn from_key(key: Key) -> Self {
        Self(key)
    }

    pub(crate) const fn key(self) -> Key {
        self.0
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == TaskId::ROOT {
            f.write_str("task(root)")
        } else {
            write!(f, "task({}.{})", self.0.index, self.0.generation)
        }
    }
}

/// A spawned task stored in the arena.
///
/// The future is taken out of the slot while it is being polled, so the
/// arena is never borrowed across a poll.
pub(crate) struct Task {
    pub(crate) future: Option<BoxFuture>,
    pub(crate) waker: Waker,
}

impl Task {
    pub(crate) fn new(id: TaskId, future: BoxFuture, remote: Arc<Remote>) -> Self {
        Self {
            future: Some(future),
            waker: Waker::from(Arc::new(TaskWaker::new(id, remote))),
        }
    }
}

/// Wraps `future` so that its output is delivered to a [`JoinHandle`].
pub(crate) fn joinable<F>(future: F) -> (BoxFuture, JoinHandle<F::Output>)
where
    F: Future + 'static,
    F::Output: 'static,
{
    let state = Rc::new(RefCell::new(JoinState::new()));
    let shared = state.clone();

    let task = Box::pin(async move {
        let output = future.await;
        let waiter = shared.borrow_mut().complete(output);

        if let (Some(waiter), Some(handle)) = (waiter, context::current_handle()) {
            handle.schedule(waiter, None);
        }
    });

    (task, JoinHandle { state })
}

/// Spawns a new task onto the current runtime.
///
/// The task is queued and first runs on a later tick; `spawn` returns
/// immediately.
///
/// # Examples
///
/// ```rust,ignore
/// let handle = ember::spawn(async { 1 + 1 });
/// assert_eq!(handle.await, 2);
/// ```
///
/// # Panics
///
/// Panics if called outside [`Runtime::block_on`](crate::Runtime::block_on).
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + 'static,
    F::Output: 'static,
{
    Handle::current().spawn(future)
}

/// Spawns a task that starts once `delay` has elapsed.
///
/// The task is not queued; it waits on its own timer and its first action
/// when resumed is to close that timer.
///
/// # Panics
///
/// Panics if called outside [`Runtime::block_on`](crate::Runtime::block_on).
pub fn spawn_after<F>(delay: Duration, future: F) -> io::Result<JoinHandle<F::Output>>
where
    F: Future + 'static,
    F::Output: 'static,
{
    Handle::current().spawn_after(delay, future)
}
