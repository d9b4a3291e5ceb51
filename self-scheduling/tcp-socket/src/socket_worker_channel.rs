use crate::frame::{decode, encode, SetupFrame};
use crate::transport_error::TransportError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use self_scheduling_core::{DispatchMessage, WorkResult, WorkerChannel, WorkerId};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{error, warn};

const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Worker end of the socket transport: a single connection to the dispatcher
pub struct SocketWorkerChannel<P> {
    worker: WorkerId,
    framed: Framed<TcpStream, LengthDelimitedCodec>,
    _payload: PhantomData<fn(P)>,
}

impl<P> SocketWorkerChannel<P> {
    /// Connect to the dispatcher, retrying while it comes up, and read the
    /// setup frame that names this worker and its kernel
    pub async fn connect<K: DeserializeOwned>(addr: &str) -> Result<(Self, K), TransportError> {
        let stream = connect_with_retry(addr).await?;
        stream.set_nodelay(true)?;
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

        let bytes = framed
            .next()
            .await
            .ok_or(TransportError::HandshakeClosed)??;
        let setup: SetupFrame<K> = decode(&bytes)?;

        Ok((
            Self {
                worker: setup.worker,
                framed,
                _payload: PhantomData,
            },
            setup.kernel,
        ))
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }
}

async fn connect_with_retry(addr: &str) -> Result<TcpStream, TransportError> {
    let mut attempts = 0;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                attempts += 1;
                if attempts >= CONNECT_ATTEMPTS {
                    error!(%addr, attempts, error = %e, "giving up on dispatcher");
                    return Err(TransportError::ConnectFailed {
                        addr: addr.to_string(),
                        attempts,
                    });
                }
                warn!(%addr, attempts, "dispatcher not reachable yet");
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }
}

#[async_trait]
impl<P> WorkerChannel<P> for SocketWorkerChannel<P>
where
    P: DeserializeOwned + Send + 'static,
{
    async fn recv(&mut self) -> Option<DispatchMessage<P>> {
        let bytes = match self.framed.next().await? {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(worker = self.worker, error = %e, "failed to read frame");
                return None;
            }
        };
        match decode(&bytes) {
            Ok(message) => Some(message),
            Err(e) => {
                error!(worker = self.worker, error = %e, "malformed dispatch frame");
                None
            }
        }
    }

    async fn send(&mut self, result: WorkResult) -> bool {
        match encode(&result) {
            Ok(bytes) => self.framed.send(bytes).await.is_ok(),
            Err(_) => false,
        }
    }
}
