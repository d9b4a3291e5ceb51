pub mod message;
pub use message::{DispatchMessage, WorkItem, WorkResult, WorkerId};

pub mod dispatch_error;
pub use dispatch_error::{DispatchError, WorkerError};

pub mod work_queue;
pub use work_queue::WorkQueue;

pub mod result_store;
pub use result_store::ResultStore;

pub mod dispatch_channel;
pub use dispatch_channel::{DispatchChannel, Reply};

pub mod worker_io;
pub use worker_io::WorkerChannel;

pub mod kernel;
pub use kernel::{dot, Kernel};

pub mod dispatcher;
pub use dispatcher::{DispatchReport, Dispatcher};

pub mod worker;
pub use worker::{Worker, WorkerSummary};

pub mod matrix;
pub use matrix::{Matrix, ShapeError};

pub mod self_scheduled_problem;
pub use self_scheduled_problem::SelfScheduledProblem;

pub mod mat_vec;
pub use mat_vec::{MatVecKernel, MatVecProblem};

pub mod mat_mat;
pub use mat_mat::{MatMatProblem, PairDotKernel, RowColumn};

pub mod simulated_channel;
pub use simulated_channel::{ReplyOrder, SimulatedChannel, TraceEvent};

pub mod run_config;
pub use run_config::{ConfigError, ProblemKind, RunConfig};

pub mod logging;
