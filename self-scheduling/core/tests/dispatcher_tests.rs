use async_trait::async_trait;
use self_scheduling_core::{
    DispatchChannel, DispatchError, DispatchMessage, Dispatcher, Kernel, MatMatProblem,
    MatVecProblem, Matrix, Reply, ReplyOrder, SelfScheduledProblem, SimulatedChannel, TraceEvent,
    WorkItem, WorkQueue, WorkResult, WorkerId,
};
use tokio_util::sync::CancellationToken;

fn simulate<S: SelfScheduledProblem>(
    problem: &S,
    workers: usize,
    order: ReplyOrder,
) -> SimulatedChannel<S::Payload, S::Kernel> {
    SimulatedChannel::new(workers, problem.kernel(), order)
}

/// Every worker sees strictly alternating Sent/Replied pairs for the same id,
/// followed by exactly one Terminated and nothing after it
fn assert_protocol_discipline<P, K>(channel: &SimulatedChannel<P, K>, workers: usize)
where
    P: Send + 'static,
    K: Kernel<P>,
{
    for worker in 0..workers {
        let events = channel.events_for(worker);
        let (last, body) = events
            .split_last()
            .unwrap_or_else(|| panic!("worker {} never addressed", worker));

        assert_eq!(
            *last,
            TraceEvent::Terminated { worker },
            "worker {} must end with Terminate",
            worker
        );
        assert_eq!(body.len() % 2, 0, "worker {} has an unanswered item", worker);

        for pair in body.chunks(2) {
            match (pair[0], pair[1]) {
                (TraceEvent::Sent { id: sent, .. }, TraceEvent::Replied { id: replied, .. }) => {
                    assert_eq!(sent, replied, "worker {} replied out of turn", worker);
                }
                other => panic!("worker {} broke one-in-flight: {:?}", worker, other),
            }
        }
    }
}

fn sent_items(trace: &[TraceEvent]) -> usize {
    trace
        .iter()
        .filter(|e| matches!(e, TraceEvent::Sent { .. }))
        .count()
}

// ============================================================
// Completeness and correlation
// ============================================================

#[tokio::test]
async fn test_mat_vec_fills_every_row() {
    for workers in [1, 2, 3, 7, 40] {
        for order in [ReplyOrder::Fifo, ReplyOrder::Lifo] {
            let problem = MatVecProblem::sample(25, 6);
            let mut channel = simulate(&problem, workers, order.clone());

            let report = Dispatcher::new(problem.work_queue().unwrap())
                .run(&mut channel)
                .await
                .unwrap();

            assert!(report.store.is_complete());
            assert_eq!(report.store.len(), 25);
            assert_eq!(report.items_per_worker.iter().sum::<usize>(), 25);
            assert_eq!(sent_items(channel.trace()), 25);
            assert_protocol_discipline(&channel, workers);

            let c = problem.assemble(report.store).unwrap();
            // sum of j*j for j in 0..6
            assert!(c.iter().all(|v| *v == 55.0), "{:?} {:?}", order, c);
        }
    }
}

#[tokio::test]
async fn test_mat_mat_results_land_on_their_own_cell() {
    let a = Matrix::from_fn(4, 3, |i, j| (i * 3 + j) as f64);
    let b = Matrix::from_fn(3, 5, |i, j| (i + 2 * j) as f64 - 1.0);
    let problem = MatMatProblem::new(a.clone(), b.clone()).unwrap();
    let mut channel = simulate(&problem, 3, ReplyOrder::Scripted(vec![2, 2, 0, 1, 2, 1, 0]));

    let report = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await
        .unwrap();
    assert_protocol_discipline(&channel, 3);

    let c = problem.assemble(report.store).unwrap();
    for i in 0..4 {
        for j in 0..5 {
            let expected: f64 = (0..3).map(|k| a.get(i, k) * b.get(k, j)).sum();
            assert_eq!(c.get(i, j), expected, "cell ({}, {})", i, j);
        }
    }
}

#[tokio::test]
async fn test_sample_mat_mat_matches_source_initialisation() {
    let problem = MatMatProblem::sample(4, 4);
    let mut channel = simulate(&problem, 2, ReplyOrder::Lifo);

    let report = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await
        .unwrap();
    let c = problem.assemble(report.store).unwrap();

    // A[i][k] = i, B[k][j] = j, so C[i][j] = i * j * 4
    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(c.get(i, j), (i * j * 4) as f64);
        }
    }
}

#[tokio::test]
async fn test_three_by_three_scenario_with_one_and_two_workers() {
    for workers in [1, 2] {
        let problem = MatVecProblem::sample(3, 3);
        let mut channel = simulate(&problem, workers, ReplyOrder::Fifo);

        let report = Dispatcher::new(problem.work_queue().unwrap())
            .run(&mut channel)
            .await
            .unwrap();

        assert_eq!(problem.assemble(report.store).unwrap(), vec![5.0, 5.0, 5.0]);
    }
}

// ============================================================
// Scheduling behaviour
// ============================================================

#[tokio::test]
async fn test_fast_worker_gets_more_items() {
    let problem = MatVecProblem::sample(10, 2);
    let mut channel = simulate(&problem, 3, ReplyOrder::Lifo);

    let report = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await
        .unwrap();

    // Worker 2 always replies first, so it is refilled every time
    assert_eq!(report.items_per_worker, vec![1, 1, 8]);
    assert_protocol_discipline(&channel, 3);
}

#[tokio::test]
async fn test_next_item_goes_to_the_worker_that_replied() {
    let problem = MatVecProblem::sample(4, 1);
    let mut channel = simulate(&problem, 2, ReplyOrder::Scripted(vec![1, 0, 1, 0]));

    Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await
        .unwrap();

    assert_eq!(
        channel.trace(),
        &[
            TraceEvent::Sent { worker: 0, id: 0 },
            TraceEvent::Sent { worker: 1, id: 1 },
            TraceEvent::Replied { worker: 1, id: 1 },
            TraceEvent::Sent { worker: 1, id: 2 },
            TraceEvent::Replied { worker: 0, id: 0 },
            TraceEvent::Sent { worker: 0, id: 3 },
            TraceEvent::Replied { worker: 1, id: 2 },
            TraceEvent::Terminated { worker: 1 },
            TraceEvent::Replied { worker: 0, id: 3 },
            TraceEvent::Terminated { worker: 0 },
        ]
    );
}

#[tokio::test]
async fn test_identical_inputs_and_reply_order_replay_identically() {
    let script = vec![1, 1, 0, 2, 0, 0, 1, 2];
    let mut traces = Vec::new();
    let mut queues = Vec::new();

    for _ in 0..2 {
        let problem = MatMatProblem::sample(3, 3);
        let queue = problem.work_queue().unwrap();
        queues.push(queue.ids());

        let mut channel = simulate(&problem, 3, ReplyOrder::Scripted(script.clone()));
        let report = Dispatcher::new(queue).run(&mut channel).await.unwrap();

        traces.push((channel.trace().to_vec(), report.items_per_worker));
    }

    assert_eq!(queues[0], queues[1]);
    assert_eq!(traces[0], traces[1]);
}

// ============================================================
// Edge cases
// ============================================================

#[tokio::test]
async fn test_more_workers_than_items() {
    let problem = MatVecProblem::sample(2, 4);
    let mut channel = simulate(&problem, 5, ReplyOrder::Fifo);

    let report = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await
        .unwrap();

    assert_eq!(report.items_per_worker, vec![1, 1, 0, 0, 0]);
    assert_protocol_discipline(&channel, 5);
    for worker in 2..5 {
        assert_eq!(
            channel.events_for(worker),
            vec![TraceEvent::Terminated { worker }],
            "idle worker {} should only be terminated",
            worker
        );
    }
}

#[tokio::test]
async fn test_zero_items_terminates_every_worker() {
    let mut channel: SimulatedChannel<Vec<f64>, _> =
        SimulatedChannel::new(3, |_: &Vec<f64>| 0.0, ReplyOrder::Fifo);

    let report = Dispatcher::new(WorkQueue::<Vec<f64>>::new())
        .run(&mut channel)
        .await
        .unwrap();

    assert!(report.store.is_empty());
    assert_eq!(report.store.into_values().unwrap(), Vec::<f64>::new());
    assert_eq!(
        channel.trace(),
        &[
            TraceEvent::Terminated { worker: 0 },
            TraceEvent::Terminated { worker: 1 },
            TraceEvent::Terminated { worker: 2 },
        ]
    );
}

#[tokio::test]
async fn test_no_workers_is_rejected() {
    let problem = MatVecProblem::sample(2, 2);
    let mut channel = simulate(&problem, 0, ReplyOrder::Fifo);

    let result = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await;

    assert_eq!(result.unwrap_err(), DispatchError::NoWorkers);
}

// ============================================================
// Protocol violations
// ============================================================

#[tokio::test]
async fn test_sparse_ids_rejected_before_any_work_is_sent() {
    let queue = WorkQueue::from_items([10, 11, 12].into_iter().map(|id| WorkItem {
        id,
        payload: vec![1.0],
    }))
    .unwrap();
    let mut channel: SimulatedChannel<Vec<f64>, _> =
        SimulatedChannel::new(2, |row: &Vec<f64>| row[0], ReplyOrder::Fifo);

    let result = Dispatcher::new(queue).run(&mut channel).await;

    assert_eq!(
        result.unwrap_err(),
        DispatchError::SparseWorkId { id: 10, len: 3 }
    );
    assert_eq!(sent_items(channel.trace()), 0);
    assert_eq!(
        channel.trace(),
        &[
            TraceEvent::Terminated { worker: 0 },
            TraceEvent::Terminated { worker: 1 },
        ]
    );
}

#[tokio::test]
async fn test_reply_from_wrong_worker_is_fatal() {
    let problem = MatVecProblem::sample(4, 2);
    let mut channel = simulate(&problem, 2, ReplyOrder::Fifo);
    // id 0 was dispatched to worker 0, not worker 1
    channel.inject_reply(1, WorkResult { id: 0, value: 0.0 });

    let result = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await;

    assert_eq!(
        result.unwrap_err(),
        DispatchError::UnknownSender { worker: 1, id: 0 }
    );
    // The abort path still releases every worker
    for worker in 0..2 {
        assert_eq!(
            channel.events_for(worker).last(),
            Some(&TraceEvent::Terminated { worker })
        );
    }
}

#[tokio::test]
async fn test_reply_for_never_dispatched_id_is_fatal() {
    let problem = MatVecProblem::sample(3, 2);
    let mut channel = simulate(&problem, 1, ReplyOrder::Fifo);
    channel.inject_reply(0, WorkResult { id: 99, value: 1.0 });

    let result = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await;

    assert_eq!(
        result.unwrap_err(),
        DispatchError::UnknownSender { worker: 0, id: 99 }
    );
}

#[tokio::test]
async fn test_duplicate_reply_is_fatal() {
    let problem = MatVecProblem::sample(4, 2);
    let mut channel = simulate(&problem, 2, ReplyOrder::Fifo);
    channel.inject_reply(0, WorkResult { id: 0, value: 1.0 });
    channel.inject_reply(0, WorkResult { id: 0, value: 1.0 });

    let result = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await;

    assert_eq!(
        result.unwrap_err(),
        DispatchError::DuplicateResult { id: 0 }
    );
}

#[tokio::test]
async fn test_send_failure_aborts_the_run() {
    let problem = MatVecProblem::sample(4, 2);
    let mut channel = simulate(&problem, 2, ReplyOrder::Fifo);
    channel.disconnect(1);

    let result = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await;

    assert_eq!(
        result.unwrap_err(),
        DispatchError::WorkerDisconnected { worker: 1 }
    );
    assert_eq!(
        channel.events_for(0),
        vec![
            TraceEvent::Sent { worker: 0, id: 0 },
            TraceEvent::Terminated { worker: 0 }
        ]
    );
}

#[tokio::test]
async fn test_unreadable_reply_aborts_immediately() {
    let problem = MatVecProblem::sample(5, 2);
    let mut channel = simulate(&problem, 2, ReplyOrder::Fifo);
    let malformed = DispatchError::MalformedReply {
        worker: 1,
        reason: "expected value".to_string(),
    };
    channel.inject_error(malformed.clone());

    let result = Dispatcher::new(problem.work_queue().unwrap())
        .run(&mut channel)
        .await;

    assert_eq!(result.unwrap_err(), malformed);
    assert_eq!(
        channel.trace(),
        &[
            TraceEvent::Sent { worker: 0, id: 0 },
            TraceEvent::Sent { worker: 1, id: 1 },
            TraceEvent::Terminated { worker: 0 },
            TraceEvent::Terminated { worker: 1 },
        ]
    );
}

/// Accepts every send and never replies
struct SilentChannel {
    workers: usize,
}

#[async_trait]
impl DispatchChannel<Vec<f64>> for SilentChannel {
    fn num_workers(&self) -> usize {
        self.workers
    }

    async fn send_to(
        &mut self,
        _worker: WorkerId,
        _message: DispatchMessage<Vec<f64>>,
    ) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn receive_from_any(&mut self) -> Option<Reply> {
        None
    }
}

#[tokio::test]
async fn test_closed_reply_channel_is_fatal() {
    let queue = WorkQueue::from_items((0..3).map(|id| WorkItem {
        id,
        payload: vec![1.0],
    }))
    .unwrap();

    let result = Dispatcher::new(queue)
        .run(&mut SilentChannel { workers: 2 })
        .await;

    assert_eq!(
        result.unwrap_err(),
        DispatchError::ChannelClosed { outstanding: 3 }
    );
}

// ============================================================
// Cancellation
// ============================================================

#[tokio::test]
async fn test_cancelled_token_aborts_steady_state() {
    let problem = MatVecProblem::sample(6, 2);
    let mut channel = simulate(&problem, 2, ReplyOrder::Fifo);
    let token = CancellationToken::new();
    token.cancel();

    let result = Dispatcher::new(problem.work_queue().unwrap())
        .with_cancellation(token)
        .run(&mut channel)
        .await;

    assert_eq!(result.unwrap_err(), DispatchError::Cancelled);
    assert_eq!(
        channel.trace(),
        &[
            TraceEvent::Sent { worker: 0, id: 0 },
            TraceEvent::Sent { worker: 1, id: 1 },
            TraceEvent::Terminated { worker: 0 },
            TraceEvent::Terminated { worker: 1 },
        ]
    );
}
