use serde::Deserialize;
use std::fs;
use std::str::FromStr;
use thiserror::Error;

/// Which multiplication to self-schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemKind {
    MatVec,
    MatMat,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown problem '{0}', expected mat-vec or mat-mat")]
pub struct UnknownProblem(String);

impl FromStr for ProblemKind {
    type Err = UnknownProblem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mat-vec" => Ok(ProblemKind::MatVec),
            "mat-mat" => Ok(ProblemKind::MatMat),
            other => Err(UnknownProblem(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run parameters shared by every runtime, read from `config.json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub problem: ProblemKind,
    pub rows: usize,
    pub cols: usize,
    pub num_workers: usize,
    /// Upper bound of the random delay a worker adds before each item
    pub max_jitter_ms: u64,
    pub log_level: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            problem: ProblemKind::MatVec,
            rows: 100,
            cols: 100,
            num_workers: 4,
            max_jitter_ms: 0,
            log_level: "info".to_string(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }
}
