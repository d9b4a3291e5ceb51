use crate::message::{DispatchMessage, WorkResult};
use async_trait::async_trait;

/// Worker side of the transport: one inbound stream from the dispatcher and
/// one outbound reply path back to it
#[async_trait]
pub trait WorkerChannel<P: Send + 'static>: Send {
    /// Receive the next message from the dispatcher
    /// Returns None if the channel is closed
    async fn recv(&mut self) -> Option<DispatchMessage<P>>;

    /// Send a result back to the dispatcher
    /// Returns true if the result was sent successfully, false otherwise
    async fn send(&mut self, result: WorkResult) -> bool;
}
