use crate::frame::{decode, encode, SetupFrame};
use crate::transport_error::TransportError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use self_scheduling_core::{
    DispatchChannel, DispatchError, DispatchMessage, Reply, WorkResult, WorkerId,
};
use serde::Serialize;
use std::marker::PhantomData;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Dispatcher end of the socket transport
///
/// Holds the write half of every worker connection. One reader task per
/// connection decodes replies and forwards them into a single mpsc receiver;
/// a frame that cannot be read is forwarded as an error and ends that reader.
pub struct SocketDispatchChannel<P> {
    writers: Vec<FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>>,
    results_rx: mpsc::Receiver<Reply>,
    readers: Vec<JoinHandle<()>>,
    _payload: PhantomData<fn(P)>,
}

impl<P> SocketDispatchChannel<P> {
    /// Accept `num_workers` connections, numbering workers in accept order,
    /// and send each one its setup frame. Gives up with
    /// `TransportError::Cancelled` once `cancellation_token` fires.
    pub async fn accept<K: Serialize>(
        listener: &TcpListener,
        num_workers: usize,
        kernel: &K,
        cancellation_token: &CancellationToken,
    ) -> Result<Self, TransportError> {
        let (results_tx, results_rx) = mpsc::channel(num_workers.max(1));
        let mut writers = Vec::with_capacity(num_workers);
        let mut readers = Vec::with_capacity(num_workers);

        for worker in 0..num_workers {
            let (stream, peer) = tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    info!(connected = worker, missing = num_workers - worker, "accept cancelled");
                    return Err(TransportError::Cancelled);
                }
                accepted = listener.accept() => accepted?,
            };
            stream.set_nodelay(true)?;
            let (read_half, write_half) = stream.into_split();

            let mut writer = FramedWrite::new(write_half, LengthDelimitedCodec::new());
            writer.send(encode(&SetupFrame { worker, kernel })?).await?;
            info!(worker, %peer, "worker connected");

            writers.push(writer);
            readers.push(tokio::spawn(forward_replies(
                worker,
                read_half,
                results_tx.clone(),
            )));
        }

        Ok(Self {
            writers,
            results_rx,
            readers,
            _payload: PhantomData,
        })
    }

    /// Barrier: close every write half and wait until each worker has hung up
    pub async fn barrier(self) {
        drop(self.writers);
        for (worker, reader) in self.readers.into_iter().enumerate() {
            if let Err(e) = reader.await {
                error!(worker, error = %e, "reply reader failed");
            }
        }
        debug!("all worker connections closed");
    }
}

async fn forward_replies(
    worker: WorkerId,
    read_half: OwnedReadHalf,
    results_tx: mpsc::Sender<Reply>,
) {
    let mut frames = FramedRead::new(read_half, LengthDelimitedCodec::new());
    while let Some(frame) = frames.next().await {
        let result = match frame
            .map_err(TransportError::from)
            .and_then(|bytes| decode::<WorkResult>(&bytes))
        {
            Ok(result) => result,
            Err(e) => {
                error!(worker, error = %e, "dropping connection");
                let malformed = DispatchError::MalformedReply {
                    worker,
                    reason: e.to_string(),
                };
                let _ = results_tx.send(Err(malformed)).await;
                return;
            }
        };
        if results_tx.send(Ok((worker, result))).await.is_err() {
            return;
        }
    }
    debug!(worker, "worker hung up");
}

#[async_trait]
impl<P: Serialize + Send + 'static> DispatchChannel<P> for SocketDispatchChannel<P> {
    fn num_workers(&self) -> usize {
        self.writers.len()
    }

    async fn send_to(
        &mut self,
        worker: WorkerId,
        message: DispatchMessage<P>,
    ) -> Result<(), DispatchError> {
        let disconnected = DispatchError::WorkerDisconnected { worker };
        let bytes = encode(&message).map_err(|e| {
            error!(worker, error = %e, "failed to encode message");
            disconnected.clone()
        })?;
        let writer = self.writers.get_mut(worker).ok_or(disconnected.clone())?;
        writer.send(bytes).await.map_err(|e| {
            error!(worker, error = %e, "failed to send message");
            disconnected
        })
    }

    async fn receive_from_any(&mut self) -> Option<Reply> {
        self.results_rx.recv().await
    }
}
