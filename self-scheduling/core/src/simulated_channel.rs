use crate::dispatch_channel::{DispatchChannel, Reply};
use crate::dispatch_error::DispatchError;
use crate::kernel::Kernel;
use crate::message::{DispatchMessage, WorkItem, WorkResult, WorkerId};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};

/// One step observed on a simulated channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Sent { worker: WorkerId, id: usize },
    Terminated { worker: WorkerId },
    Replied { worker: WorkerId, id: usize },
}

/// Which busy worker answers next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOrder {
    /// Oldest outstanding item first
    Fifo,
    /// Most recently dispatched item first, so one worker keeps winning
    Lifo,
    /// Listed workers first, in order, whenever they have an item pending;
    /// falls back to Fifo once the script runs out or names an idle worker
    Scripted(Vec<WorkerId>),
}

/// In-memory, single-threaded stand-in for a worker pool
///
/// Workers are simulated inline: a dispatched item sits in the worker's inbox
/// until `receive_from_any` picks that worker, applies the kernel and replies.
/// Every send and reply is appended to a trace.
pub struct SimulatedChannel<P, K> {
    kernel: K,
    inboxes: Vec<VecDeque<WorkItem<P>>>,
    pending: VecDeque<WorkerId>,
    order: ReplyOrder,
    script_cursor: usize,
    injected: VecDeque<Reply>,
    disconnected: HashSet<WorkerId>,
    trace: Vec<TraceEvent>,
}

impl<P, K> SimulatedChannel<P, K>
where
    P: Send + 'static,
    K: Kernel<P>,
{
    pub fn new(num_workers: usize, kernel: K, order: ReplyOrder) -> Self {
        Self {
            kernel,
            inboxes: (0..num_workers).map(|_| VecDeque::new()).collect(),
            pending: VecDeque::new(),
            order,
            script_cursor: 0,
            injected: VecDeque::new(),
            disconnected: HashSet::new(),
            trace: Vec::new(),
        }
    }

    /// Queue a forged reply that is delivered before any simulated one
    pub fn inject_reply(&mut self, worker: WorkerId, result: WorkResult) {
        self.injected.push_back(Ok((worker, result)));
    }

    /// Queue a transport failure that is delivered before any simulated reply
    pub fn inject_error(&mut self, error: DispatchError) {
        self.injected.push_back(Err(error));
    }

    /// Make every later send to `worker` fail
    pub fn disconnect(&mut self, worker: WorkerId) {
        self.disconnected.insert(worker);
    }

    pub fn trace(&self) -> &[TraceEvent] {
        &self.trace
    }

    /// Trace events that were addressed to or sent by `worker`
    pub fn events_for(&self, worker: WorkerId) -> Vec<TraceEvent> {
        self.trace
            .iter()
            .copied()
            .filter(|event| match event {
                TraceEvent::Sent { worker: w, .. }
                | TraceEvent::Terminated { worker: w }
                | TraceEvent::Replied { worker: w, .. } => *w == worker,
            })
            .collect()
    }

    fn pick_worker(&mut self) -> Option<WorkerId> {
        let position = match &self.order {
            ReplyOrder::Fifo => 0,
            ReplyOrder::Lifo => self.pending.len().checked_sub(1)?,
            ReplyOrder::Scripted(script) => {
                let scripted = script.get(self.script_cursor).copied();
                self.script_cursor += 1;
                scripted
                    .and_then(|worker| self.pending.iter().position(|w| *w == worker))
                    .unwrap_or(0)
            }
        };
        self.pending.remove(position)
    }
}

#[async_trait]
impl<P, K> DispatchChannel<P> for SimulatedChannel<P, K>
where
    P: Send + 'static,
    K: Kernel<P>,
{
    fn num_workers(&self) -> usize {
        self.inboxes.len()
    }

    async fn send_to(
        &mut self,
        worker: WorkerId,
        message: DispatchMessage<P>,
    ) -> Result<(), DispatchError> {
        if self.disconnected.contains(&worker) || worker >= self.inboxes.len() {
            return Err(DispatchError::WorkerDisconnected { worker });
        }
        match message {
            DispatchMessage::Work(item) => {
                self.trace.push(TraceEvent::Sent {
                    worker,
                    id: item.id,
                });
                self.inboxes[worker].push_back(item);
                self.pending.push_back(worker);
            }
            DispatchMessage::Terminate => {
                self.trace.push(TraceEvent::Terminated { worker });
            }
        }
        Ok(())
    }

    async fn receive_from_any(&mut self) -> Option<Reply> {
        if let Some(forged) = self.injected.pop_front() {
            return Some(forged);
        }

        let worker = self.pick_worker()?;
        let item = self.inboxes[worker].pop_front()?;
        let value = self.kernel.compute(&item.payload);
        self.trace.push(TraceEvent::Replied {
            worker,
            id: item.id,
        });
        Some(Ok((worker, WorkResult { id: item.id, value })))
    }
}
