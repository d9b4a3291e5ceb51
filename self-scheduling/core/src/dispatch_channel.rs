use crate::dispatch_error::DispatchError;
use crate::message::{DispatchMessage, WorkResult, WorkerId};
use async_trait::async_trait;

/// A result tagged with the worker that sent it, or the reason a reply could
/// not be read
pub type Reply = Result<(WorkerId, WorkResult), DispatchError>;

/// Dispatcher side of the transport
/// Different implementations for mpsc, sockets, simulated traces, etc.
#[async_trait]
pub trait DispatchChannel<P: Send + 'static>: Send {
    /// Number of workers reachable through this channel, ids are `0..num_workers`
    fn num_workers(&self) -> usize;

    /// Deliver a message to one worker
    async fn send_to(
        &mut self,
        worker: WorkerId,
        message: DispatchMessage<P>,
    ) -> Result<(), DispatchError>;

    /// Block until any worker replies
    /// Returns None once every worker's reply side has been dropped, and an
    /// error as soon as a reply arrives that cannot be read
    async fn receive_from_any(&mut self) -> Option<Reply>;
}
