use anyhow::Result;
use clap::Parser;
use self_scheduling_core::logging::init_logging;
use self_scheduling_core::{
    MatMatProblem, MatVecKernel, MatVecProblem, PairDotKernel, ProblemKind, RowColumn, RunConfig,
};
use self_scheduling_tcp_socket::{run_dispatcher, run_local, run_worker, Role};
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Self-scheduled matrix multiplication over TCP connections
#[derive(Parser, Debug)]
#[command(name = "self-scheduling-tcp-socket", version, about)]
struct Args {
    #[arg(long, value_enum)]
    role: Role,

    /// Path to the JSON run configuration
    #[arg(long, default_value = "config.json")]
    config: String,

    /// Address the dispatcher listens on
    #[arg(long, default_value = "127.0.0.1:7400")]
    listen: String,

    /// Dispatcher address a worker connects to
    #[arg(long, default_value = "127.0.0.1:7400")]
    connect: String,

    /// mat-vec or mat-mat
    #[arg(long)]
    problem: Option<ProblemKind>,

    #[arg(long)]
    rows: Option<usize>,

    #[arg(long)]
    cols: Option<usize>,

    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();
    let args = Args::parse();

    let (mut config, load_error) = match RunConfig::load(&args.config) {
        Ok(cfg) => (cfg, None),
        Err(e) => (RunConfig::default(), Some(e)),
    };
    config.problem = args.problem.unwrap_or(config.problem);
    config.rows = args.rows.unwrap_or(config.rows);
    config.cols = args.cols.unwrap_or(config.cols);
    config.num_workers = args.workers.unwrap_or(config.num_workers);
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level);
    if let Some(e) = load_error {
        warn!("Failed to load {}: {}, using default configuration", args.config, e);
    }
    info!(role = ?args.role, ?config, "configuration");

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, initiating shutdown");
            ctrl_c_token.cancel();
        }
    });

    match (args.role, config.problem) {
        (Role::Worker, ProblemKind::MatVec) => {
            let summary = run_worker::<Vec<f64>, MatVecKernel>(&args.connect, token).await?;
            info!(items = summary.items_processed, "worker done");
        }
        (Role::Worker, ProblemKind::MatMat) => {
            let summary = run_worker::<RowColumn, PairDotKernel>(&args.connect, token).await?;
            info!(items = summary.items_processed, "worker done");
        }
        (Role::Dispatcher, ProblemKind::MatVec) => {
            let listener = TcpListener::bind(&args.listen).await?;
            let problem = MatVecProblem::sample(config.rows, config.cols);
            let outcome = run_dispatcher(&problem, listener, config.num_workers, token).await?;
            info!(
                items_per_worker = ?outcome.items_per_worker,
                checksum = outcome.output.iter().sum::<f64>(),
                "matrix-vector product complete"
            );
        }
        (Role::Dispatcher, ProblemKind::MatMat) => {
            let listener = TcpListener::bind(&args.listen).await?;
            let problem = MatMatProblem::sample(config.rows, config.cols);
            let outcome = run_dispatcher(&problem, listener, config.num_workers, token).await?;
            info!(
                items_per_worker = ?outcome.items_per_worker,
                rows = outcome.output.rows(),
                cols = outcome.output.cols(),
                "matrix-matrix product complete"
            );
        }
        (Role::Local, ProblemKind::MatVec) => {
            let problem = MatVecProblem::sample(config.rows, config.cols);
            let outcome = run_local(&problem, config.num_workers, token).await?;
            info!(
                items_per_worker = ?outcome.items_per_worker,
                checksum = outcome.output.iter().sum::<f64>(),
                "matrix-vector product complete"
            );
        }
        (Role::Local, ProblemKind::MatMat) => {
            let problem = MatMatProblem::sample(config.rows, config.cols);
            let outcome = run_local(&problem, config.num_workers, token).await?;
            info!(
                items_per_worker = ?outcome.items_per_worker,
                rows = outcome.output.rows(),
                cols = outcome.output.cols(),
                "matrix-matrix product complete"
            );
        }
    }

    info!(
        elapsed_s = start_time.elapsed().as_secs_f64(),
        "program complete"
    );
    Ok(())
}
