pub mod local;


use crate::config::BenchmarkParameters;
use std::io;
use thiserror::Error;

pub use local::LocalExecutor;

/// exit code when the benchmark was killed instead of exiting
pub const EXIT_SIGNALED: u8 = 1;
/// exit code when the benchmark never started: spawn, lock or config failure
pub const EXIT_NOT_STARTED: u8 = 2;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` failed with exit code {code}")]
    Failed { command: String, code: i32 },
    #[error("`{command}` was terminated by signal {signal}")]
    Signaled { command: String, signal: i32 },
}

impl ExecutorError {
    /// process exit code this failure maps to, never 0
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Spawn { .. } => EXIT_NOT_STARTED,
            Self::Failed { code, .. } => u8::try_from(*code)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(EXIT_SIGNALED),
            Self::Signaled { .. } => EXIT_SIGNALED,
        }
    }
}

/// Runs a benchmark to completion, blocking the caller
pub trait Executor {
    fn execute(&mut self, parameters: &BenchmarkParameters) -> Result<(), ExecutorError>;
}
