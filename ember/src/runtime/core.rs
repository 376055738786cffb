use crate::error::{Error, Result};
use crate::reactor::poller::{Poller, Ready, Token};
use crate::reactor::{Event, WaiterTable};
use crate::runtime::context;
use crate::runtime::handle::{Handle, Shared};
use crate::runtime::queue::{Entry, ReadyQueue};
use crate::runtime::shutdown::{ShutdownHandle, ShutdownState};
use crate::runtime::task::waker::{Remote, TaskWaker};
use crate::runtime::task::{JoinHandle, TaskId};
use crate::utils::Slab;

use log::{info, trace};
use std::cell::RefCell;
use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

/// Initial capacity of the task arena.
const INITIAL_TASKS: usize = 64;

/// The single-threaded cooperative runtime.
///
/// `Runtime` owns the poller, the waiter table, the ready queue and the task
/// arena. Tasks only make progress while [`block_on`](Self::block_on) runs
/// on the runtime's thread; there is no background thread.
///
/// Dropping the runtime drops every task that has not completed, which
/// closes the sockets and timers they own.
pub struct Runtime {
    handle: Handle,
}

impl Runtime {
    pub(crate) fn new(poller: Poller, max_fds: usize) -> Self {
        let notifier = poller.notifier();

        let shared = Shared {
            poller: RefCell::new(poller),
            waiters: RefCell::new(WaiterTable::new(max_fds)),
            ready: RefCell::new(ReadyQueue::default()),
            tasks: RefCell::new(Slab::with_capacity(INITIAL_TASKS)),
            remote: Arc::new(Remote::new(notifier.clone())),
            shutdown: Arc::new(ShutdownState::new(notifier)),
        };

        Self {
            handle: Handle {
                shared: Rc::new(shared),
            },
        }
    }

    /// Returns a handle to this runtime.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns a future onto the runtime.
    ///
    /// The task starts running on the next tick of [`block_on`](Self::block_on).
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let handle = runtime.spawn(async { 42 });
    /// assert_eq!(runtime.block_on(handle)?, 42);
    /// ```
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        self.handle.spawn(future)
    }

    /// Returns a handle that can stop this runtime from any thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.handle.shutdown_handle()
    }

    /// Runs `future` to completion on the current thread, driving every
    /// spawned task while it waits.
    ///
    /// Returns `Err(Error::Shutdown)` if shutdown is requested before the
    /// future completes; the future is dropped in that case. Tasks that did
    /// not finish stay in the runtime and continue on the next call.
    ///
    /// # Panics
    ///
    /// Panics if called while a runtime is already running on this thread,
    /// including from inside a task. A panic inside a task is not caught and
    /// unwinds out of `block_on`.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let result = runtime.block_on(async {
    ///     42
    /// })?;
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let _enter = context::enter_runtime(self.handle.clone());

        let mut future = pin!(future);
        let waker = Waker::from(Arc::new(TaskWaker::new(
            TaskId::ROOT,
            self.handle.shared.remote.clone(),
        )));
        let mut cx = Context::from_waker(&waker);

        let mut root = |event: Option<Event>| {
            let _task = context::enter_task(TaskId::ROOT, event);
            future.as_mut().poll(&mut cx)
        };

        self.handle.schedule(TaskId::ROOT, None);

        let mut batch = Vec::new();
        let mut events = Vec::new();

        let result = loop {
            match self.tick(&mut batch, &mut events, &mut root) {
                Ok(Some(output)) => break Ok(output),
                Ok(None) => {}
                Err(err) => break Err(err),
            }
        };

        self.handle.shared.ready.borrow_mut().forget(TaskId::ROOT);

        result
    }

    /// Runs one iteration of the dispatch loop.
    ///
    /// Returns `Some` once the root future has completed.
    fn tick<T>(
        &self,
        batch: &mut Vec<Entry>,
        events: &mut Vec<(Token, Ready)>,
        root: &mut dyn FnMut(Option<Event>) -> Poll<T>,
    ) -> Result<Option<T>> {
        let shared = &self.handle.shared;

        batch.clear();
        self.take_remote();
        shared.ready.borrow_mut().drain_into(batch);

        let timeout = poll_timeout(batch);
        shared
            .poller
            .borrow_mut()
            .poll(events, timeout)
            .map_err(Error::Poll)?;

        for (token, ready) in events.drain(..) {
            match token {
                Token::Fd(fd) => {
                    let waiter = shared.waiters.borrow_mut().take(fd);
                    shared.poller.borrow().unregister(fd);

                    if let Some(waiter) = waiter {
                        batch.push(Entry {
                            task: waiter.task,
                            event: Some(Event {
                                fd,
                                ready,
                                seq: waiter.seq,
                            }),
                        });
                    }
                }

                Token::Notify => {
                    for task in shared.remote.take() {
                        batch.push(Entry { task, event: None });
                    }
                }

                Token::Signal(signal) => {
                    info!("received signal {signal}, shutting down");
                    shared.shutdown.request();
                }
            }
        }

        trace!(
            "tick: {} ready, {} tasks alive",
            batch.len(),
            shared.tasks.borrow().len()
        );

        let mut entries = batch.drain(..);

        while let Some(entry) = entries.next() {
            if shared.shutdown.is_requested() {
                let rest: Vec<_> = std::iter::once(entry).chain(entries).collect();
                shared.ready.borrow_mut().requeue_front(rest.into_iter());
                return Err(Error::Shutdown);
            }

            if entry.task == TaskId::ROOT {
                if let Poll::Ready(output) = root(entry.event) {
                    let rest: Vec<_> = entries.collect();
                    shared.ready.borrow_mut().requeue_front(rest.into_iter());
                    return Ok(Some(output));
                }
            } else {
                self.run_task(entry);
            }
        }

        if shared.shutdown.is_requested() {
            return Err(Error::Shutdown);
        }

        Ok(None)
    }

    /// Polls one spawned task with its resume payload installed.
    fn run_task(&self, entry: Entry) {
        let shared = &self.handle.shared;
        let id = entry.task;

        let claimed = shared
            .tasks
            .borrow_mut()
            .get_mut(id.key())
            .and_then(|task| Some((task.future.take()?, task.waker.clone())));

        // Completed tasks leave stale ids behind in queues and wakers.
        let Some((mut future, waker)) = claimed else {
            return;
        };

        let mut cx = Context::from_waker(&waker);
        let poll = {
            let _task = context::enter_task(id, entry.event);
            future.as_mut().poll(&mut cx)
        };

        match poll {
            Poll::Pending => {
                if let Some(task) = shared.tasks.borrow_mut().get_mut(id.key()) {
                    task.future = Some(future);
                }
            }

            Poll::Ready(()) => {
                trace!("{id} completed");
                let task = shared.tasks.borrow_mut().remove(id.key());
                drop(task);
                drop(future);
            }
        }
    }

    /// Moves wake-ups from foreign wakers into the ready queue.
    fn take_remote(&self) {
        let shared = &self.handle.shared;
        let woken = shared.remote.take();

        let mut ready = shared.ready.borrow_mut();
        for task in woken {
            ready.push(task, None);
        }
    }
}

impl Drop for Runtime {
    /// Drops every unfinished task.
    ///
    /// Tasks hold handles to the runtime, so the arena is emptied first and
    /// the futures are dropped outside of any borrow.
    fn drop(&mut self) {
        let tasks = self.handle.shared.tasks.borrow_mut().drain();
        drop(tasks);
    }
}

/// Timeout for the next poll: a non-empty batch must not block.
pub(crate) fn poll_timeout(batch: &[Entry]) -> Option<Duration> {
    if batch.is_empty() {
        None
    } else {
        Some(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_batch_blocks_indefinitely() {
        assert_eq!(poll_timeout(&[]), None);
    }

    #[test]
    fn pending_work_polls_without_blocking() {
        let batch = [Entry {
            task: TaskId::ROOT,
            event: None,
        }];

        assert_eq!(poll_timeout(&batch), Some(Duration::ZERO));
    }
}
