use crate::dispatch_error::WorkerError;
use crate::kernel::Kernel;
use crate::message::{DispatchMessage, WorkResult, WorkerId};
use crate::worker_io::WorkerChannel;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// What a worker did before it was told to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSummary {
    pub worker: WorkerId,
    pub items_processed: usize,
}

/// Long-lived worker loop
///
/// Holds no state between items: receive, compute, reply, until Terminate.
pub struct Worker<P, K> {
    id: WorkerId,
    kernel: K,
    cancellation_token: CancellationToken,
    _payload: PhantomData<fn(P)>,
}

impl<P, K> Worker<P, K>
where
    P: Send + 'static,
    K: Kernel<P>,
{
    pub fn new(id: WorkerId, kernel: K) -> Self {
        Self {
            id,
            kernel,
            cancellation_token: CancellationToken::new(),
            _payload: PhantomData,
        }
    }

    /// Stop waiting for work when the token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Runs until the dispatcher sends Terminate or the token is cancelled
    pub async fn run<C>(&self, channel: &mut C) -> Result<WorkerSummary, WorkerError>
    where
        C: WorkerChannel<P>,
    {
        let mut items_processed = 0;

        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    debug!(worker = self.id, items_processed, "worker cancelled");
                    return Err(WorkerError::Cancelled { worker: self.id });
                }
                received = channel.recv() => received,
            };
            let item = match received {
                Some(DispatchMessage::Work(item)) => item,
                Some(DispatchMessage::Terminate) => break,
                None => return Err(WorkerError::ChannelClosed { worker: self.id }),
            };

            let value = self.kernel.compute(&item.payload);
            trace!(worker = self.id, id = item.id, value, "computed item");

            if !channel.send(WorkResult { id: item.id, value }).await {
                return Err(WorkerError::ReplyFailed {
                    worker: self.id,
                    id: item.id,
                });
            }
            items_processed += 1;
        }

        debug!(worker = self.id, items_processed, "worker terminated");
        Ok(WorkerSummary {
            worker: self.id,
            items_processed,
        })
    }
}
