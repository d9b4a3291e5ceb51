use async_trait::async_trait;
use rand::Rng;
use self_scheduling_core::{
    DispatchChannel, DispatchError, DispatchMessage, Reply, WorkResult, WorkerChannel, WorkerId,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// Capacity of each worker's inbound queue: one item plus a Terminate sent on abort
const WORKER_INBOX_CAPACITY: usize = 2;

/// Dispatcher end: one sender per worker, every reply fanned into one receiver
pub struct ChannelDispatchChannel<P> {
    senders: Vec<mpsc::Sender<DispatchMessage<P>>>,
    results_rx: mpsc::Receiver<(WorkerId, WorkResult)>,
}

/// Worker end: its own inbound receiver plus a clone of the shared reply sender
pub struct ChannelWorkerChannel<P> {
    worker: WorkerId,
    rx: mpsc::Receiver<DispatchMessage<P>>,
    results_tx: mpsc::Sender<(WorkerId, WorkResult)>,
    max_jitter_ms: u64,
}

/// Wire up a dispatcher and `num_workers` workers
pub fn channel_pool<P: Send + 'static>(
    num_workers: usize,
    max_jitter_ms: u64,
) -> (ChannelDispatchChannel<P>, Vec<ChannelWorkerChannel<P>>) {
    // Each worker has at most one reply outstanding, so this never fills up
    let (results_tx, results_rx) = mpsc::channel(num_workers.max(1));

    let mut senders = Vec::with_capacity(num_workers);
    let mut workers = Vec::with_capacity(num_workers);
    for worker in 0..num_workers {
        let (tx, rx) = mpsc::channel(WORKER_INBOX_CAPACITY);
        senders.push(tx);
        workers.push(ChannelWorkerChannel {
            worker,
            rx,
            results_tx: results_tx.clone(),
            max_jitter_ms,
        });
    }

    (
        ChannelDispatchChannel {
            senders,
            results_rx,
        },
        workers,
    )
}

#[async_trait]
impl<P: Send + 'static> DispatchChannel<P> for ChannelDispatchChannel<P> {
    fn num_workers(&self) -> usize {
        self.senders.len()
    }

    async fn send_to(
        &mut self,
        worker: WorkerId,
        message: DispatchMessage<P>,
    ) -> Result<(), DispatchError> {
        let sender = self
            .senders
            .get(worker)
            .ok_or(DispatchError::WorkerDisconnected { worker })?;
        sender
            .send(message)
            .await
            .map_err(|_| DispatchError::WorkerDisconnected { worker })
    }

    async fn receive_from_any(&mut self) -> Option<Reply> {
        self.results_rx.recv().await.map(Ok)
    }
}

impl<P> ChannelWorkerChannel<P> {
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Random per-item delay, so workers finish unevenly
    fn jitter(&self) -> Option<Duration> {
        if self.max_jitter_ms == 0 {
            return None;
        }
        let ms = rand::rng().random_range(0..=self.max_jitter_ms);
        Some(Duration::from_millis(ms))
    }
}

#[async_trait]
impl<P: Send + 'static> WorkerChannel<P> for ChannelWorkerChannel<P> {
    async fn recv(&mut self) -> Option<DispatchMessage<P>> {
        let message = self.rx.recv().await?;
        if !message.is_terminate() {
            if let Some(delay) = self.jitter() {
                tokio::time::sleep(delay).await;
            }
        }
        Some(message)
    }

    async fn send(&mut self, result: WorkResult) -> bool {
        self.results_tx.send((self.worker, result)).await.is_ok()
    }
}
