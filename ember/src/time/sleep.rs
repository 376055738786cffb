use crate::reactor::{Interest, Timer};
use crate::runtime::Handle;
use crate::runtime::context;

use std::future::Future;
use std::os::fd::AsRawFd;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Creates a future that completes after the given duration.
///
/// On first poll the future arms a [`Timer`] and suspends the current task
/// on it. The timer is closed when the sleep completes or is dropped.
///
/// # Panics
///
/// Panics if polled outside a runtime task, or if the kernel refuses to
/// create or register the timer descriptor (for example when the process
/// is out of descriptors).
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// sleep(Duration::from_millis(10)).await;
/// ```
pub fn sleep(duration: Duration) -> Sleep {
    Sleep {
        duration,
        state: State::Idle,
    }
}

/// Future returned by [`sleep`].
///
/// Dropping an unfinished `Sleep` removes its registration, so the task is
/// not resumed by the timer.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Sleep {
    duration: Duration,
    state: State,
}

enum State {
    Idle,
    Waiting {
        timer: Timer,
        handle: Handle,
        seq: u64,
    },
    Done,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match &this.state {
            State::Idle => {
                let handle = Handle::current();
                let task = context::expect_task();

                let timer = match Timer::after(this.duration) {
                    Ok(timer) => timer,
                    Err(err) => panic!("failed to create sleep timer: {err}"),
                };

                let seq = match handle.watch(timer.as_raw_fd(), Interest::READABLE, task) {
                    Ok(seq) => seq,
                    Err(err) => panic!("failed to register sleep timer: {err}"),
                };

                this.state = State::Waiting { timer, handle, seq };

                Poll::Pending
            }

            State::Waiting { seq, .. } => {
                let seq = *seq;

                if context::take_wake(|event| event.seq == seq).is_none() {
                    return Poll::Pending;
                }

                this.state = State::Done;
                Poll::Ready(())
            }

            State::Done => Poll::Ready(()),
        }
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let State::Waiting { timer, handle, seq } = &self.state {
            handle.unwatch(timer.as_raw_fd(), *seq);
        }
    }
}
