use crate::reactor::Event;
use crate::runtime::task::TaskId;

use std::collections::VecDeque;

/// A task due to be resumed, with its optional resume payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) task: TaskId,
    pub(crate) event: Option<Event>,
}

/// Ordered list of tasks to resume on the next tick.
///
/// The dispatch loop drains the whole queue at the start of a tick, so
/// entries pushed while that batch runs are deferred to the following one.
#[derive(Default)]
pub(crate) struct ReadyQueue {
    entries: VecDeque<Entry>,
}

impl ReadyQueue {
    pub(crate) fn push(&mut self, task: TaskId, event: Option<Event>) {
        self.entries.push_back(Entry { task, event });
    }

    /// Moves every queued entry, in order, to the end of `batch`.
    pub(crate) fn drain_into(&mut self, batch: &mut Vec<Entry>) {
        batch.extend(self.entries.drain(..));
    }

    /// Puts entries that were drained but not run back at the head of the
    /// queue, keeping their order.
    pub(crate) fn requeue_front(&mut self, rest: impl DoubleEndedIterator<Item = Entry>) {
        for entry in rest.rev() {
            self.entries.push_front(entry);
        }
    }

    /// Drops every entry addressed to `task`.
    pub(crate) fn forget(&mut self, task: TaskId) {
        self.entries.retain(|entry| entry.task != task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::Ready;
    use crate::utils::Key;

    fn task(index: usize) -> TaskId {
        TaskId::from_key(Key {
            index,
            generation: 0,
        })
    }

    fn tasks(batch: &[Entry]) -> Vec<TaskId> {
        batch.iter().map(|entry| entry.task).collect()
    }

    #[test]
    fn drain_preserves_fifo_order() {
        let mut queue = ReadyQueue::default();
        queue.push(task(1), None);
        queue.push(task(2), None);
        queue.push(task(3), None);

        let mut batch = Vec::new();
        queue.drain_into(&mut batch);

        assert_eq!(tasks(&batch), vec![task(1), task(2), task(3)]);

        batch.clear();
        queue.drain_into(&mut batch);
        assert!(batch.is_empty());
    }

    #[test]
    fn pushes_during_a_batch_wait_for_the_next_drain() {
        let mut queue = ReadyQueue::default();
        queue.push(task(1), None);

        let mut batch = Vec::new();
        queue.drain_into(&mut batch);
        queue.push(task(2), None);

        assert_eq!(tasks(&batch), vec![task(1)]);

        batch.clear();
        queue.drain_into(&mut batch);
        assert_eq!(tasks(&batch), vec![task(2)]);
    }

    #[test]
    fn requeue_front_keeps_order_ahead_of_new_entries() {
        let mut queue = ReadyQueue::default();
        let event = Event {
            fd: 4,
            ready: Ready::READABLE,
            seq: 1,
        };

        queue.push(task(9), None);
        queue.requeue_front(
            vec![
                Entry {
                    task: task(1),
                    event: Some(event),
                },
                Entry {
                    task: task(2),
                    event: None,
                },
            ]
            .into_iter(),
        );

        let mut batch = Vec::new();
        queue.drain_into(&mut batch);

        assert_eq!(tasks(&batch), vec![task(1), task(2), task(9)]);
        assert_eq!(batch[0].event, Some(event));
    }

    #[test]
    fn forget_removes_only_matching_task() {
        let mut queue = ReadyQueue::default();
        queue.push(task(1), None);
        queue.push(TaskId::ROOT, None);
        queue.push(task(2), None);

        queue.forget(TaskId::ROOT);

        let mut batch = Vec::new();
        queue.drain_into(&mut batch);
        assert_eq!(tasks(&batch), vec![task(1), task(2)]);
    }
}
