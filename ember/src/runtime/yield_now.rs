use crate::reactor::{Event, Ready};
use crate::runtime::Handle;
use crate::runtime::context;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that yields execution back to the dispatch loop exactly once.
///
/// Holds the ticket of its own queue entry once scheduled. Only that entry
/// completes the yield; any other resume of the task in the same tick
/// leaves it pending.
struct YieldOnce(Option<u64>);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.0 {
            None => {
                let handle = Handle::current();
                let seq = handle.ticket();
                let event = Event {
                    fd: -1,
                    ready: Ready::EMPTY,
                    seq,
                };

                handle.schedule(context::expect_task(), Some(event));
                self.0 = Some(seq);
                Poll::Pending
            }

            Some(seq) => match context::take_wake(|event| event.seq == seq) {
                Some(_) => Poll::Ready(()),
                None => Poll::Pending,
            },
        }
    }
}

/// Yields execution back to the dispatch loop.
///
/// Every task that was already ready in this tick runs before the caller
/// resumes.
///
/// # Examples
///
/// ```rust,ignore
/// async fn task() {
///     // Allow other tasks to run
///     ember::yield_now().await;
/// }
/// ```
///
/// # Panics
///
/// Panics if awaited outside a runtime task.
pub async fn yield_now() {
    YieldOnce(None).await
}
