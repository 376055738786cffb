use crate::reactor::poller::{Interest, Poller};
use crate::reactor::{Event, Timer, WaiterTable};
use crate::runtime::ShutdownHandle;
use crate::runtime::context;
use crate::runtime::queue::ReadyQueue;
use crate::runtime::shutdown::ShutdownState;
use crate::runtime::task::waker::Remote;
use crate::runtime::task::{self, BoxFuture, JoinHandle, Task, TaskId};
use crate::utils::Slab;

use log::trace;
use std::cell::RefCell;
use std::future::Future;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// State owned by one runtime and reachable from every [`Handle`].
pub(crate) struct Shared {
    pub(crate) poller: RefCell<Poller>,
    pub(crate) waiters: RefCell<WaiterTable>,
    pub(crate) ready: RefCell<ReadyQueue>,
    pub(crate) tasks: RefCell<Slab<Task>>,
    pub(crate) remote: Arc<Remote>,
    pub(crate) shutdown: Arc<ShutdownState>,
}

/// A cheap, clonable reference to a runtime.
///
/// A `Handle` can spawn tasks and bind sockets to its runtime. It is tied to
/// the thread of the runtime (`!Send`). Inside
/// [`block_on`](crate::Runtime::block_on) the current handle is also
/// available through [`Handle::current`].
#[derive(Clone)]
pub struct Handle {
    pub(crate) shared: Rc<Shared>,
}

impl Handle {
    /// Returns the handle of the runtime running on this thread.
    ///
    /// # Panics
    ///
    /// Panics if called outside [`Runtime::block_on`](crate::Runtime::block_on).
    pub fn current() -> Handle {
        match context::current_handle() {
            Some(handle) => handle,
            None => panic!("must be called from within an ember runtime"),
        }
    }

    /// Returns the handle of the runtime running on this thread, if any.
    pub fn try_current() -> Option<Handle> {
        context::current_handle()
    }

    /// Spawns a new task onto this runtime.
    ///
    /// See [`spawn`](crate::spawn).
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let (future, handle) = task::joinable(future);
        let id = self.insert_task(future);

        trace!("spawned {id}");
        self.schedule(id, None);

        handle
    }

    /// Spawns a task that starts once `delay` has elapsed.
    ///
    /// See [`spawn_after`](crate::spawn_after).
    pub fn spawn_after<F>(&self, delay: Duration, future: F) -> io::Result<JoinHandle<F::Output>>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let timer = Timer::after(delay)?;
        let fd = timer.as_raw_fd();

        let (future, handle) = task::joinable(async move {
            drop(timer);
            future.await
        });
        let id = self.insert_task(future);

        if let Err(err) = self.watch(fd, Interest::READABLE, id) {
            let task = self.shared.tasks.borrow_mut().remove(id.key());
            drop(task);
            return Err(err);
        }

        trace!("spawned {id} after {delay:?}");

        Ok(handle)
    }

    /// Returns a handle that can stop this runtime from any thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            state: self.shared.shutdown.clone(),
        }
    }

    /// Queues `task` to be resumed on the next tick.
    pub(crate) fn schedule(&self, task: TaskId, event: Option<Event>) {
        self.shared.ready.borrow_mut().push(task, event);
    }

    /// Registers `task` as the sole waiter of `fd` and returns the ticket
    /// its resume payload will carry.
    ///
    /// A previous waiter of `fd` is replaced. If the poller refuses the
    /// descriptor the table entry is rolled back.
    pub(crate) fn watch(&self, fd: RawFd, interest: Interest, task: TaskId) -> io::Result<u64> {
        if fd < 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }

        let (waiter, previous) = self.shared.waiters.borrow_mut().set(fd, task);
        if let Some(previous) = previous.filter(|previous| previous.task != task) {
            trace!("fd {fd}: {} replaced by {task}", previous.task);
        }

        if let Err(err) = self.shared.poller.borrow().register(fd, interest) {
            self.shared.waiters.borrow_mut().clear_if(fd, waiter.seq);
            return Err(err);
        }

        Ok(waiter.seq)
    }

    /// Cancels the registration with ticket `seq` on `fd`, if it still
    /// holds the descriptor.
    pub(crate) fn unwatch(&self, fd: RawFd, seq: u64) {
        let cleared = self.shared.waiters.borrow_mut().clear_if(fd, seq);

        if cleared {
            self.shared.poller.borrow().unregister(fd);
        }
    }

    /// Issues a ticket for a payload that is not tied to a descriptor.
    pub(crate) fn ticket(&self) -> u64 {
        self.shared.waiters.borrow_mut().ticket()
    }

    /// Drops any registration on `fd`, whoever holds it.
    ///
    /// Used before closing a descriptor so that a recycled descriptor
    /// number never resumes a stale waiter.
    pub(crate) fn forget(&self, fd: RawFd) {
        self.shared.waiters.borrow_mut().clear(fd);
        self.shared.poller.borrow().unregister(fd);
    }

    fn insert_task(&self, future: BoxFuture) -> TaskId {
        let remote = self.shared.remote.clone();

        let key = self
            .shared
            .tasks
            .borrow_mut()
            .insert_with(|key| Task::new(TaskId::from_key(key), future, remote));

        TaskId::from_key(key)
    }
}
