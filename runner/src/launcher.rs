use crate::{
    config::BenchmarkParameters,
    executors::{Executor, ExecutorError, EXIT_NOT_STARTED},
    sync::{LockError, LockMarker, ReleaseGuard},
};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// exit code when the attempt went fine but the lock file was gone at release
pub const EXIT_RELEASE_FAILED: u8 = 3;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl LaunchError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Lock(_) => EXIT_NOT_STARTED,
            Self::Executor(error) => error.exit_code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// the benchmark ran and exited successfully
    Completed,
    /// somebody else holds the lock, nothing was launched
    AlreadyRunning { holder: String },
}

/// result of one attempt, including the release that always follows it
#[derive(Debug)]
pub struct RunReport {
    pub outcome: Result<Outcome, LaunchError>,
    pub release: Result<(), LockError>,
}

impl RunReport {
    /// a failed attempt decides the exit code, a failed release only matters otherwise
    pub fn exit_code(&self) -> u8 {
        match (&self.outcome, &self.release) {
            (Err(error), _) => error.exit_code(),
            (Ok(_), Err(_)) => EXIT_RELEASE_FAILED,
            (Ok(_), Ok(())) => 0,
        }
    }
}

/// Runs the benchmark behind a lock marker
#[derive(Debug)]
pub struct Launcher<E> {
    lock: LockMarker,
    executor: E,
}

impl<E: Executor> Launcher<E> {
    pub fn new(lock: LockMarker, executor: E) -> Self {
        Self { lock, executor }
    }

    /// acquire, launch and release, the release runs on every path
    #[instrument(skip(self, parameters), level = "info")]
    pub fn run(&mut self, identity: &str, parameters: &BenchmarkParameters) -> RunReport {
        let Self { lock, executor } = self;
        let guard = ReleaseGuard::new(lock);

        let outcome = match lock.acquire(identity) {
            Ok(()) => executor
                .execute(parameters)
                .map(|()| Outcome::Completed)
                .map_err(LaunchError::from),
            Err(LockError::AlreadyRunning { holder }) => Ok(Outcome::AlreadyRunning { holder }),
            Err(error) => Err(error.into()),
        };

        let release = guard.finish();

        match &outcome {
            Ok(Outcome::Completed) => info!("Benchmark finished"),
            Ok(Outcome::AlreadyRunning { holder }) => {
                warn!(holder = %holder, "{holder} already running benchmark")
            }
            Err(error) => error!(error = ?error, "Benchmark attempt failed: {error}"),
        }
        if let Err(error) = &release {
            error!(error = ?error, "{error}");
        }

        RunReport { outcome, release }
    }
}
