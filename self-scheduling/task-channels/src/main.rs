use anyhow::Result;
use clap::Parser;
use self_scheduling_core::logging::init_logging;
use self_scheduling_core::{MatMatProblem, MatVecProblem, ProblemKind, RunConfig};
use self_scheduling_task_channels::TokioRuntime;
use std::time::Instant;
use tracing::{info, warn};

/// Self-scheduled matrix multiplication over tokio tasks and mpsc channels
#[derive(Parser, Debug)]
#[command(name = "self-scheduling-task-channels", version, about)]
struct Args {
    /// Path to the JSON run configuration
    #[arg(long, default_value = "config.json")]
    config: String,

    /// mat-vec or mat-mat
    #[arg(long)]
    problem: Option<ProblemKind>,

    #[arg(long)]
    rows: Option<usize>,

    #[arg(long)]
    cols: Option<usize>,

    #[arg(long)]
    workers: Option<usize>,

    /// Random delay in milliseconds each worker may add before an item
    #[arg(long)]
    max_jitter_ms: Option<u64>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn resolve(self) -> (RunConfig, Option<String>) {
        let (mut config, load_error) = match RunConfig::load(&self.config) {
            Ok(cfg) => (cfg, None),
            Err(e) => (RunConfig::default(), Some(format!("{}: {}", self.config, e))),
        };
        if let Some(problem) = self.problem {
            config.problem = problem;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.cols = cols;
        }
        if let Some(workers) = self.workers {
            config.num_workers = workers;
        }
        if let Some(jitter) = self.max_jitter_ms {
            config.max_jitter_ms = jitter;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        (config, load_error)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();
    let (config, load_error) = Args::parse().resolve();
    init_logging(&config.log_level);

    if let Some(e) = load_error {
        warn!("Failed to load {}, using default configuration", e);
    }
    info!(?config, "configuration");

    let runtime = TokioRuntime::new(config.num_workers).with_jitter(config.max_jitter_ms);

    // Ctrl+C aborts the dispatch loop and releases the workers
    let ctrl_c_token = runtime.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, initiating shutdown");
            ctrl_c_token.cancel();
        }
    });

    match config.problem {
        ProblemKind::MatVec => {
            let problem = MatVecProblem::sample(config.rows, config.cols);
            let outcome = runtime.run(&problem).await?;
            info!(
                items_per_worker = ?outcome.items_per_worker,
                checksum = outcome.output.iter().sum::<f64>(),
                "matrix-vector product complete"
            );
        }
        ProblemKind::MatMat => {
            let problem = MatMatProblem::sample(config.rows, config.cols);
            let outcome = runtime.run(&problem).await?;
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
