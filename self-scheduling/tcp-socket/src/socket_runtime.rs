use crate::socket_dispatch_channel::SocketDispatchChannel;
use crate::socket_worker_channel::SocketWorkerChannel;
use crate::transport_error::TransportError;
use self_scheduling_core::{
    DispatchError, Dispatcher, Kernel, SelfScheduledProblem, Worker, WorkerError, WorkerSummary,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SocketRunError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Assembled output plus how many items each connected worker answered
#[derive(Debug)]
pub struct DispatchOutcome<O> {
    pub output: O,
    pub items_per_worker: Vec<usize>,
}

/// Dispatcher role: wait for `num_workers` connections, self-schedule the
/// problem over them, then wait for every connection to close
pub async fn run_dispatcher<S>(
    problem: &S,
    listener: TcpListener,
    num_workers: usize,
    cancellation_token: CancellationToken,
) -> Result<DispatchOutcome<S::Output>, SocketRunError>
where
    S: SelfScheduledProblem,
    S::Payload: Serialize,
    S::Kernel: Serialize,
{
    let local_addr = listener.local_addr().map_err(TransportError::from)?;
    info!(
        problem = problem.name(),
        items = problem.item_count(),
        workers = num_workers,
        addr = %local_addr,
        "waiting for workers"
    );

    let queue = problem.work_queue()?;
    if num_workers == 0 {
        return Err(DispatchError::NoWorkers.into());
    }
    let kernel = problem.kernel();
    let accepted = SocketDispatchChannel::<S::Payload>::accept(
        &listener,
        num_workers,
        &kernel,
        &cancellation_token,
    )
    .await;
    let mut channel = match accepted {
        Ok(channel) => channel,
        Err(TransportError::Cancelled) => return Err(DispatchError::Cancelled.into()),
        Err(e) => return Err(e.into()),
    };

    let dispatched = Dispatcher::new(queue)
        .with_cancellation(cancellation_token)
        .run(&mut channel)
        .await;
    channel.barrier().await;
    let report = dispatched?;

    info!(items_per_worker = ?report.items_per_worker, "all workers disconnected");
    let items_per_worker = report.items_per_worker;
    Ok(DispatchOutcome {
        output: problem.assemble(report.store)?,
        items_per_worker,
    })
}

/// Worker role: connect, learn identity and kernel, serve until Terminate.
/// Cancelling the token stops the worker whether it is still connecting or
/// waiting for its next item.
pub async fn run_worker<P, K>(
    addr: &str,
    cancellation_token: CancellationToken,
) -> Result<WorkerSummary, SocketRunError>
where
    P: DeserializeOwned + Send + 'static,
    K: Kernel<P> + DeserializeOwned,
{
    let (mut channel, kernel) = tokio::select! {
        biased;
        _ = cancellation_token.cancelled() => return Err(TransportError::Cancelled.into()),
        connected = SocketWorkerChannel::<P>::connect::<K>(addr) => connected?,
    };
    let worker = Worker::new(channel.worker(), kernel).with_cancellation(cancellation_token);
    info!(worker = worker.id(), %addr, "worker ready");

    Ok(worker.run(&mut channel).await?)
}

/// Dispatcher and workers in one process, talking over loopback TCP
pub async fn run_local<S>(
    problem: &S,
    num_workers: usize,
    cancellation_token: CancellationToken,
) -> Result<DispatchOutcome<S::Output>, SocketRunError>
where
    S: SelfScheduledProblem,
    S::Payload: Serialize + DeserializeOwned,
    S::Kernel: Serialize + DeserializeOwned,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(TransportError::from)?;
    let addr = listener
        .local_addr()
        .map_err(TransportError::from)?
        .to_string();

    let handles: Vec<_> = (0..num_workers)
        .map(|_| {
            let addr = addr.clone();
            let token = cancellation_token.clone();
            tokio::spawn(async move { run_worker::<S::Payload, S::Kernel>(&addr, token).await })
        })
        .collect();

    let outcome = run_dispatcher(problem, listener, num_workers, cancellation_token).await;

    for handle in handles {
        match handle.await? {
            Ok(summary) => info!(
                worker = summary.worker,
                items = summary.items_processed,
                "worker finished"
            ),
            Err(e) => error!(error = %e, "worker failed"),
        }
    }
    outcome
}
