use crate::dispatch_error::DispatchError;
use crate::kernel::Kernel;
use crate::result_store::ResultStore;
use crate::work_queue::WorkQueue;

/// Trait describing a computation that can be split into independent work
/// items and self-scheduled across workers
pub trait SelfScheduledProblem: Send + Sync + 'static {
    /// Data carried by each work item
    type Payload: Send + 'static;

    /// Kernel every worker applies; cloned once per worker, which is how any
    /// read-only shared input reaches them
    type Kernel: Kernel<Self::Payload> + Clone + 'static;

    /// Final assembled output
    type Output;

    fn name(&self) -> &'static str;

    /// Number of work items the queue will hold
    fn item_count(&self) -> usize;

    /// Build the full queue, in deterministic dispatch order
    fn work_queue(&self) -> Result<WorkQueue<Self::Payload>, DispatchError>;

    fn kernel(&self) -> Self::Kernel;

    /// Turn a complete result store back into the problem's output shape
    fn assemble(&self, store: ResultStore) -> Result<Self::Output, DispatchError>;
}
