use serde::{Deserialize, Serialize};

/// Identity of a worker slot, assigned by the runtime in creation/accept order
pub type WorkerId = usize;

/// One indivisible unit of dispatched computation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkItem<P> {
    pub id: usize,
    pub payload: P,
}

/// Answer to a single work item, correlated by id
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WorkResult {
    pub id: usize,
    pub value: f64,
}

/// Message types received by workers
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum DispatchMessage<P> {
    /// Work assignment
    Work(WorkItem<P>),
    /// No more work, the worker should exit its loop
    Terminate,
}

impl<P> DispatchMessage<P> {
    pub fn is_terminate(&self) -> bool {
        matches!(self, DispatchMessage::Terminate)
    }
}
