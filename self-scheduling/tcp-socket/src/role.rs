use clap::ValueEnum;

/// Part a process plays in a run, chosen explicitly on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// Owns the queue and result store, listens for workers
    Dispatcher,
    /// Connects to a dispatcher and serves work items until terminated
    Worker,
    /// Dispatcher and workers in one process over loopback
    Local,
}
