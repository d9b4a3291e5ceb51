pub mod channel_wrappers;
pub use channel_wrappers::{channel_pool, ChannelDispatchChannel, ChannelWorkerChannel};

pub mod tokio_runtime;
pub use tokio_runtime::{RunError, RunOutcome, TokioRuntime};
