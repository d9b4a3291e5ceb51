pub mod frame;
pub use frame::SetupFrame;

pub mod transport_error;
pub use transport_error::TransportError;

pub mod socket_dispatch_channel;
pub use socket_dispatch_channel::SocketDispatchChannel;

pub mod socket_worker_channel;
pub use socket_worker_channel::SocketWorkerChannel;

pub mod socket_runtime;
pub use socket_runtime::{run_dispatcher, run_local, run_worker, DispatchOutcome, SocketRunError};

pub mod role;
pub use role::Role;
