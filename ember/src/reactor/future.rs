use crate::reactor::poller::{Interest, Ready};
use crate::runtime::Handle;
use crate::runtime::context;

use std::future::Future;
use std::io;
use std::os::fd::RawFd;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Suspends the current task until `fd` is ready for `interest`.
///
/// The current task becomes the sole waiter of `fd`: if another task waits
/// on the same descriptor afterwards it replaces this one, and this future
/// is never resumed by that descriptor. Errors and hangups are always
/// reported, whatever the interest.
///
/// Registering can fail, for example with `EPERM` for regular files; the
/// error is returned on first poll.
///
/// # Examples
///
/// ```rust,ignore
/// use ember::io::{Interest, wait};
///
/// let ready = wait(fd, Interest::READABLE).await?;
/// assert!(ready.is_readable());
/// ```
///
/// # Panics
///
/// Polling the returned future outside a runtime task panics.
pub fn wait(fd: RawFd, interest: Interest) -> Readiness {
    Readiness::new(None, fd, interest)
}

/// Suspends the current task until any of the given descriptors is ready.
///
/// Every pair is registered for the current task. On resume all the
/// remaining registrations are removed and the descriptor that fired is
/// returned along with its readiness. An empty slice is an
/// `InvalidInput` error.
///
/// # Panics
///
/// Polling the returned future outside a runtime task panics.
pub fn wait_multi(interests: &[(RawFd, Interest)]) -> ReadinessAny {
    ReadinessAny {
        interests: interests.to_vec(),
        state: MultiState::Idle,
    }
}

/// Future returned by [`wait`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Readiness {
    fd: RawFd,
    interest: Interest,
    state: State,
}

enum State {
    /// Not registered yet. Holds the handle to register with, if bound.
    Idle(Option<Handle>),

    /// Registered as the waiter of `fd` under ticket `seq`.
    Waiting { handle: Handle, seq: u64 },

    Done,
}

impl Readiness {
    /// Creates a readiness future bound to `handle`, or to the current
    /// runtime when `None`.
    pub(crate) fn new(handle: Option<Handle>, fd: RawFd, interest: Interest) -> Self {
        Self {
            fd,
            interest,
            state: State::Idle(handle),
        }
    }
}

impl Future for Readiness {
    type Output = io::Result<Ready>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match &mut this.state {
            State::Idle(handle) => {
                let handle = handle.take().unwrap_or_else(Handle::current);
                let task = context::expect_task();

                let seq = match handle.watch(this.fd, this.interest, task) {
                    Ok(seq) => seq,
                    Err(err) => {
                        this.state = State::Done;
                        return Poll::Ready(Err(err));
                    }
                };

                this.state = State::Waiting { handle, seq };
                Poll::Pending
            }

            State::Waiting { seq, .. } => {
                let seq = *seq;

                match context::take_wake(|event| event.seq == seq) {
                    Some(event) => {
                        this.state = State::Done;
                        Poll::Ready(Ok(event.ready))
                    }
                    None => Poll::Pending,
                }
            }

            State::Done => panic!("`Readiness` polled after completion"),
        }
    }
}

impl Drop for Readiness {
    fn drop(&mut self) {
        if let State::Waiting { handle, seq } = &self.state {
            handle.unwatch(self.fd, *seq);
        }
    }
}

/// Future returned by [`wait_multi`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct ReadinessAny {
    interests: Vec<(RawFd, Interest)>,
    state: MultiState,
}

enum MultiState {
    Idle,

    /// Registered on every descriptor; `seqs[i]` is the ticket for
    /// `interests[i]`.
    Waiting { handle: Handle, seqs: Vec<u64> },

    Done,
}

impl ReadinessAny {
    fn unwatch_all(&self, handle: &Handle, seqs: &[u64]) {
        for (&(fd, _), &seq) in self.interests.iter().zip(seqs) {
            handle.unwatch(fd, seq);
        }
    }
}

impl Future for ReadinessAny {
    type Output = io::Result<(RawFd, Ready)>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match &this.state {
            MultiState::Idle => {
                if this.interests.is_empty() {
                    this.state = MultiState::Done;
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "wait_multi needs at least one descriptor",
                    )));
                }

                let handle = Handle::current();
                let task = context::expect_task();

                let mut seqs = Vec::with_capacity(this.interests.len());

                for &(fd, interest) in &this.interests {
                    match handle.watch(fd, interest, task) {
                        Ok(seq) => seqs.push(seq),
                        Err(err) => {
                            this.unwatch_all(&handle, &seqs);
                            this.state = MultiState::Done;
                            return Poll::Ready(Err(err));
                        }
                    }
                }

                this.state = MultiState::Waiting { handle, seqs };
                Poll::Pending
            }

            MultiState::Waiting { handle, seqs } => {
                let Some(event) = context::take_wake(|event| seqs.contains(&event.seq)) else {
                    return Poll::Pending;
                };

                this.unwatch_all(handle, seqs);
                this.state = MultiState::Done;

                Poll::Ready(Ok((event.fd, event.ready)))
            }

            MultiState::Done => panic!("`ReadinessAny` polled after completion"),
        }
    }
}

impl Drop for ReadinessAny {
    fn drop(&mut self) {
        if let MultiState::Waiting { handle, seqs } = &self.state {
            self.unwatch_all(handle, seqs);
        }
    }
}
