use crate::reactor::Event;
use crate::runtime::Handle;
use crate::runtime::task::TaskId;

use std::cell::{Cell, RefCell};

thread_local! {
    /// Handle of the runtime currently inside `block_on` on this thread.
    ///
    /// This allows free functions such as `spawn` and `sleep` to reach the
    /// runtime without explicit parameter passing.
    static CURRENT_HANDLE: RefCell<Option<Handle>> = const { RefCell::new(None) };

    /// Task being polled by the dispatch loop, if any.
    static CURRENT_TASK: Cell<Option<TaskId>> = const { Cell::new(None) };

    /// Resume payload of the task being polled, until a leaf future claims it.
    static WAKE: Cell<Option<Event>> = const { Cell::new(None) };
}

/// Restores the previous runtime context when dropped.
pub(crate) struct EnterGuard {
    _private: (),
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        CURRENT_HANDLE.with(|cell| cell.replace(None));
    }
}

/// Installs `handle` as the current runtime for this thread.
///
/// # Panics
///
/// Panics if a runtime is already running on this thread. `block_on` cannot
/// be nested, neither from inside a task nor from another `block_on`.
pub(crate) fn enter_runtime(handle: Handle) -> EnterGuard {
    CURRENT_HANDLE.with(|cell| {
        let mut current = cell.borrow_mut();

        if current.is_some() {
            panic!("cannot start a runtime from within a runtime");
        }

        *current = Some(handle);
    });

    EnterGuard { _private: () }
}

/// Returns a clone of the current runtime handle.
pub(crate) fn current_handle() -> Option<Handle> {
    CURRENT_HANDLE.with(|cell| cell.borrow().clone())
}

/// Clears the task context when dropped.
pub(crate) struct TaskGuard {
    previous: Option<TaskId>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        CURRENT_TASK.with(|cell| cell.set(self.previous));
        WAKE.with(|cell| cell.set(None));
    }
}

/// Marks `task` as running with the given resume payload.
pub(crate) fn enter_task(task: TaskId, event: Option<Event>) -> TaskGuard {
    let previous = CURRENT_TASK.with(|cell| cell.replace(Some(task)));
    WAKE.with(|cell| cell.set(event));

    TaskGuard { previous }
}

/// Returns the task being polled, if any.
pub(crate) fn current_task() -> Option<TaskId> {
    CURRENT_TASK.with(Cell::get)
}

/// Returns the task being polled.
///
/// # Panics
///
/// Panics when called outside a task polled by the dispatch loop.
pub(crate) fn expect_task() -> TaskId {
    match current_task() {
        Some(task) => task,
        None => panic!("ember futures must be polled from a task running on an ember runtime"),
    }
}

/// Claims the resume payload if `matches` accepts it.
///
/// A payload is claimed at most once per poll; later callers see `None`.
pub(crate) fn take_wake(matches: impl FnOnce(&Event) -> bool) -> Option<Event> {
    WAKE.with(|cell| {
        let event = cell.get()?;

        if matches(&event) {
            cell.set(None);
            Some(event)
        } else {
            None
        }
    })
}
