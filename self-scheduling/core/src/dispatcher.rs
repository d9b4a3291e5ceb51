use crate::dispatch_channel::DispatchChannel;
use crate::dispatch_error::DispatchError;
use crate::message::{DispatchMessage, WorkResult, WorkerId};
use crate::result_store::ResultStore;
use crate::work_queue::WorkQueue;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything the dispatcher collected over a run
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub store: ResultStore,
    /// Number of items each worker answered, indexed by worker id
    pub items_per_worker: Vec<usize>,
}

/// Self-scheduling manager
///
/// Owns the queue and the result store. Saturates every worker with one item,
/// then answers each incoming result with exactly one message to the worker that
/// sent it: the next queued item, or Terminate once the queue is drained.
/// A worker never holds more than one unanswered item.
pub struct Dispatcher<P> {
    queue: WorkQueue<P>,
    store: ResultStore,
    total: usize,
    sent: usize,
    in_flight: Vec<Option<usize>>,
    terminated: Vec<bool>,
    items_per_worker: Vec<usize>,
    cancellation_token: CancellationToken,
}

impl<P: Send + 'static> Dispatcher<P> {
    pub fn new(queue: WorkQueue<P>) -> Self {
        let total = queue.len();
        Self {
            queue,
            store: ResultStore::new(total),
            total,
            sent: 0,
            in_flight: Vec::new(),
            terminated: Vec::new(),
            items_per_worker: Vec::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Abort the steady-state phase when the token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Runs the complete dispatch protocol over `channel`
    ///
    /// On success every worker has been sent exactly one Terminate. The caller
    /// must still join its workers before reading the report's store.
    pub async fn run<C>(mut self, channel: &mut C) -> Result<DispatchReport, DispatchError>
    where
        C: DispatchChannel<P>,
    {
        let workers = channel.num_workers();
        if workers == 0 {
            return Err(DispatchError::NoWorkers);
        }
        self.in_flight = vec![None; workers];
        self.terminated = vec![false; workers];
        self.items_per_worker = vec![0; workers];

        if let Some(id) = self.queue.first_sparse_id() {
            let cause = DispatchError::SparseWorkId {
                id,
                len: self.total,
            };
            return Err(self.abort(channel, cause).await);
        }

        info!(items = self.total, workers, "dispatch started");

        if let Err(e) = self.saturate(channel).await {
            return Err(self.abort(channel, e).await);
        }

        let token = self.cancellation_token.clone();
        for _ in 0..self.total {
            let received = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    warn!(outstanding = self.outstanding(), "dispatch cancelled");
                    return Err(self.abort(channel, DispatchError::Cancelled).await);
                }
                received = channel.receive_from_any() => received,
            };

            let step = match received {
                Some(Ok((worker, result))) => self.handle_result(channel, worker, result).await,
                Some(Err(e)) => Err(e),
                None => Err(DispatchError::ChannelClosed {
                    outstanding: self.outstanding(),
                }),
            };
            if let Err(e) = step {
                return Err(self.abort(channel, e).await);
            }
        }

        info!(items = self.total, sent = self.sent, "dispatch finished");
        Ok(DispatchReport {
            store: self.store,
            items_per_worker: self.items_per_worker,
        })
    }

    /// One item per worker in id order; workers beyond the item count are
    /// terminated straight away so none of them waits forever
    async fn saturate<C>(&mut self, channel: &mut C) -> Result<(), DispatchError>
    where
        C: DispatchChannel<P>,
    {
        for worker in 0..self.in_flight.len() {
            if self.queue.has_next() {
                self.send_next(channel, worker).await?;
            } else {
                debug!(worker, "no work for idle worker");
                self.terminate(channel, worker).await?;
            }
        }
        Ok(())
    }

    async fn handle_result<C>(
        &mut self,
        channel: &mut C,
        worker: WorkerId,
        result: WorkResult,
    ) -> Result<(), DispatchError>
    where
        C: DispatchChannel<P>,
    {
        if self.store.contains(result.id) {
            return Err(DispatchError::DuplicateResult { id: result.id });
        }
        match self.in_flight.get(worker) {
            Some(Some(id)) if *id == result.id => {}
            _ => {
                return Err(DispatchError::UnknownSender {
                    worker,
                    id: result.id,
                })
            }
        }

        self.store.record(result)?;
        self.in_flight[worker] = None;
        self.items_per_worker[worker] += 1;
        debug!(worker, id = result.id, "result recorded");

        if self.queue.has_next() {
            self.send_next(channel, worker).await
        } else {
            self.terminate(channel, worker).await
        }
    }

    async fn send_next<C>(&mut self, channel: &mut C, worker: WorkerId) -> Result<(), DispatchError>
    where
        C: DispatchChannel<P>,
    {
        let item = self.queue.next()?;
        let id = item.id;
        channel.send_to(worker, DispatchMessage::Work(item)).await?;
        self.in_flight[worker] = Some(id);
        self.sent += 1;
        debug!(worker, id, sent = self.sent, "item dispatched");
        Ok(())
    }

    async fn terminate<C>(&mut self, channel: &mut C, worker: WorkerId) -> Result<(), DispatchError>
    where
        C: DispatchChannel<P>,
    {
        channel.send_to(worker, DispatchMessage::Terminate).await?;
        self.terminated[worker] = true;
        debug!(worker, "worker terminated");
        Ok(())
    }

    /// Best-effort Terminate to every worker still running, then hand back the
    /// fault that ended the run
    async fn abort<C>(&mut self, channel: &mut C, cause: DispatchError) -> DispatchError
    where
        C: DispatchChannel<P>,
    {
        error!(error = %cause, "dispatch aborted");
        for worker in 0..self.terminated.len() {
            if !self.terminated[worker]
                && channel
                    .send_to(worker, DispatchMessage::Terminate)
                    .await
                    .is_ok()
            {
                self.terminated[worker] = true;
            }
        }
        cause
    }

    fn outstanding(&self) -> usize {
        self.total - self.store.len()
    }
}
