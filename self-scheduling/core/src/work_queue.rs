use crate::dispatch_error::DispatchError;
use crate::message::WorkItem;
use std::collections::{HashSet, VecDeque};

/// FIFO of work items still to be assigned
///
/// Insertion order is dispatch order. Items are consumed strictly front to back,
/// never reordered and never retried. Each id may be enqueued only once.
#[derive(Debug, Clone)]
pub struct WorkQueue<P> {
    items: VecDeque<WorkItem<P>>,
    seen: HashSet<usize>,
}

impl<P> WorkQueue<P> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Append an item at the back of the queue
    pub fn enqueue(&mut self, item: WorkItem<P>) -> Result<(), DispatchError> {
        if !self.seen.insert(item.id) {
            return Err(DispatchError::DuplicateWorkId { id: item.id });
        }
        self.items.push_back(item);
        Ok(())
    }

    /// Build a queue from items in dispatch order
    pub fn from_items(items: impl IntoIterator<Item = WorkItem<P>>) -> Result<Self, DispatchError> {
        let mut queue = WorkQueue::new();
        for item in items {
            queue.enqueue(item)?;
        }
        Ok(queue)
    }

    pub fn has_next(&self) -> bool {
        !self.items.is_empty()
    }

    /// Remove and return the front item
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<WorkItem<P>, DispatchError> {
        self.items.pop_front().ok_or(DispatchError::EmptyQueue)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First id that falls outside `0..len`; with unique ids, None means the
    /// queue holds exactly the ids `0..len`
    pub fn first_sparse_id(&self) -> Option<usize> {
        let len = self.items.len();
        self.items.iter().map(|item| item.id).find(|id| *id >= len)
    }

    /// Ids in dispatch order
    pub fn ids(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.id).collect()
    }
}

impl<P> Default for WorkQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}
