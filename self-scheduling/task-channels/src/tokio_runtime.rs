use crate::channel_wrappers::channel_pool;
use self_scheduling_core::{
    DispatchError, Dispatcher, SelfScheduledProblem, Worker, WorkerError, WorkerSummary,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Output of a completed run plus how the work was spread
#[derive(Debug)]
pub struct RunOutcome<O> {
    pub output: O,
    pub items_per_worker: Vec<usize>,
    pub worker_summaries: Vec<WorkerSummary>,
}

/// Tokio task-based runtime: one task per worker, the dispatcher on the caller's task
pub struct TokioRuntime {
    num_workers: usize,
    max_jitter_ms: u64,
    cancellation_token: CancellationToken,
}

impl TokioRuntime {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            max_jitter_ms: 0,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_jitter(mut self, max_jitter_ms: u64) -> Self {
        self.max_jitter_ms = max_jitter_ms;
        self
    }

    /// Returns a clone of the cancellation token for external control
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Spawn the workers, dispatch every item, then join all workers before
    /// assembling the output
    pub async fn run<S: SelfScheduledProblem>(
        &self,
        problem: &S,
    ) -> Result<RunOutcome<S::Output>, RunError> {
        info!(
            problem = problem.name(),
            items = problem.item_count(),
            workers = self.num_workers,
            "starting run"
        );

        let queue = problem.work_queue()?;
        let (mut dispatch_channel, worker_channels) =
            channel_pool::<S::Payload>(self.num_workers, self.max_jitter_ms);

        let handles: Vec<JoinHandle<Result<WorkerSummary, WorkerError>>> = worker_channels
            .into_iter()
            .map(|mut channel| {
                let worker = Worker::new(channel.worker(), problem.kernel());
                tokio::spawn(async move { worker.run(&mut channel).await })
            })
            .collect();

        let dispatched = Dispatcher::new(queue)
            .with_cancellation(self.cancellation_token.clone())
            .run(&mut dispatch_channel)
            .await;
        // Any worker that was not terminated sees its inbox close
        drop(dispatch_channel);

        let worker_summaries = join_workers(handles).await;
        let report = dispatched?;
        let worker_summaries = worker_summaries?;

        info!(items_per_worker = ?report.items_per_worker, "all workers joined");
        let items_per_worker = report.items_per_worker;
        let output = problem.assemble(report.store)?;

        Ok(RunOutcome {
            output,
            items_per_worker,
            worker_summaries,
        })
    }
}

/// Barrier: wait for every worker, keeping the first failure
async fn join_workers(
    handles: Vec<JoinHandle<Result<WorkerSummary, WorkerError>>>,
) -> Result<Vec<WorkerSummary>, RunError> {
    let mut summaries = Vec::with_capacity(handles.len());
    let mut first_error = None;

    for (idx, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(summary)) => summaries.push(summary),
            Ok(Err(e)) => {
                error!(worker = idx, error = %e, "worker failed");
                first_error.get_or_insert(RunError::Worker(e));
            }
            Err(e) => {
                error!(worker = idx, error = %e, "worker task failed");
                first_error.get_or_insert(RunError::Join(e));
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(summaries),
    }
}
