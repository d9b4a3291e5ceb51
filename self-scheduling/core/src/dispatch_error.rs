use crate::message::WorkerId;
use thiserror::Error;

/// Protocol faults raised by the dispatcher
///
/// None of these are transient: the protocol has no timeouts and no redelivery,
/// so every variant aborts the run and no partial output is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Popped from a queue with nothing left in it
    #[error("work queue is empty")]
    EmptyQueue,

    /// Two work items were enqueued under the same id
    #[error("work id {id} was enqueued twice")]
    DuplicateWorkId { id: usize },

    /// Queue ids are not exactly `0..len`, so results cannot be stored by id
    #[error("work id {id} outside dense range 0..{len}")]
    SparseWorkId { id: usize, len: usize },

    /// A reply arrived for an id that was never dispatched to that worker
    #[error("worker {worker} replied for id {id} which it was never sent")]
    UnknownSender { worker: WorkerId, id: usize },

    /// A worker sent a frame that is not a result
    #[error("worker {worker} sent a malformed reply: {reason}")]
    MalformedReply { worker: WorkerId, reason: String },

    /// A second reply arrived for an id already recorded
    #[error("duplicate result for id {id}")]
    DuplicateResult { id: usize },

    /// A result id falls outside the store allocated for the run
    #[error("result id {id} outside store of {capacity} slots")]
    IdOutOfRange { id: usize, capacity: usize },

    /// Dispatch needs at least one worker besides the dispatcher
    #[error("at least one worker is required")]
    NoWorkers,

    /// A message could not be delivered to a worker
    #[error("worker {worker} disconnected")]
    WorkerDisconnected { worker: WorkerId },

    /// Every reply sender was dropped before all results were collected
    #[error("reply channel closed with {outstanding} results outstanding")]
    ChannelClosed { outstanding: usize },

    /// The store was consumed before every slot was written
    #[error("{missing} results missing from the result store")]
    IncompleteResults { missing: usize },

    /// The run was aborted through its cancellation token
    #[error("dispatch cancelled")]
    Cancelled,
}

/// Faults raised inside a worker loop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The dispatcher side hung up before sending Terminate
    #[error("worker {worker} lost its dispatcher before termination")]
    ChannelClosed { worker: WorkerId },

    /// The worker's cancellation token fired while it waited for work
    #[error("worker {worker} cancelled")]
    Cancelled { worker: WorkerId },

    /// The reply for an item could not be delivered
    #[error("worker {worker} failed to deliver result for id {id}")]
    ReplyFailed { worker: WorkerId, id: usize },
}
