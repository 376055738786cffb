use crate::runtime::context;
use crate::runtime::task::TaskId;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// A handle to a spawned task.
///
/// A `JoinHandle` allows awaiting the result of a task spawned onto
/// the runtime. It implements [`Future`] and resolves once the task
/// has completed.
///
/// Dropping the `JoinHandle` does **not** cancel the task; it only
/// discards the ability to observe its result.
///
/// # Panics
///
/// Awaiting a `JoinHandle` outside a runtime task panics, and so does
/// polling it again after it returned the output.
pub struct JoinHandle<T> {
    pub(crate) state: Rc<RefCell<JoinState<T>>>,
}

/// State shared between a task and its [`JoinHandle`].
pub(crate) struct JoinState<T> {
    /// Output of the task, set once when it completes.
    output: Option<T>,

    /// `true` once the task has completed.
    finished: bool,

    /// Task awaiting the handle, resumed when the output is set.
    waiter: Option<TaskId>,
}

impl<T> JoinState<T> {
    pub(crate) fn new() -> Self {
        Self {
            output: None,
            finished: false,
            waiter: None,
        }
    }

    /// Stores the output and returns the task to resume, if any.
    pub(crate) fn complete(&mut self, output: T) -> Option<TaskId> {
        self.output = Some(output);
        self.finished = true;
        self.waiter.take()
    }
}

impl<T> JoinHandle<T> {
    /// Returns `true` once the task has run to completion.
    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<T> {
        let mut state = self.state.borrow_mut();

        if let Some(output) = state.output.take() {
            return Poll::Ready(output);
        }

        if state.finished {
            panic!("`JoinHandle` polled after completion");
        }

        state.waiter = Some(context::expect_task());

        Poll::Pending
    }
}

impl<T> Drop for JoinHandle<T> {
    fn drop(&mut self) {
        self.state.borrow_mut().waiter = None;
    }
}
