use super::{Executor, ExecutorError};
use crate::config::{check_executable, BenchmarkParameters, LauncherConfig};
use itertools::Itertools;
use std::{
    io, iter,
    os::unix::process::ExitStatusExt,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
    time::Instant,
};
use tracing::{debug, info, instrument, warn};

/// Executor running the benchmark script as a child of this process
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    directory: PathBuf,
    script: PathBuf,
}

impl LocalExecutor {
    pub fn new(directory: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            script: script.into(),
        }
    }

    /// create a new LocalExecutor from a resolved launcher config
    pub fn load(config: &LauncherConfig) -> Self {
        Self::new(config.repo_dir.clone(), config.script.clone())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// the command line as it would be typed inside `directory`
    pub fn command_line(&self, parameters: &BenchmarkParameters) -> String {
        iter::once(self.script.to_string_lossy().into_owned())
            .chain(parameters.to_args())
            .map(|arg| {
                if arg.is_empty() || arg.contains(char::is_whitespace) {
                    format!("{arg:?}")
                } else {
                    arg
                }
            })
            .join(" ")
    }

    // resolved against `directory` so the lookup doesn't depend on our own cwd
    fn program(&self) -> PathBuf {
        self.directory.join(&self.script)
    }

    // scripts without a `#!` line are handed to `sh`, the way a shell would run them
    fn spawn_and_wait(&self, parameters: &BenchmarkParameters) -> io::Result<ExitStatus> {
        match Command::new(self.program())
            .args(parameters.to_args())
            .current_dir(&self.directory)
            .status()
        {
            Err(error) if error.raw_os_error() == Some(nix::libc::ENOEXEC) => {
                debug!("Script has no interpreter line, retrying through sh");

                Command::new("sh")
                    .arg(self.program())
                    .args(parameters.to_args())
                    .current_dir(&self.directory)
                    .status()
            }
            result => result,
        }
    }

    /// log everything that will make spawning fail, returns true if anything was found
    pub fn preflight_checks(&self) -> bool {
        let mut contains_error = false;

        if !self.directory.is_dir() {
            warn!(
                "Working directory {} does not exist or is not a directory",
                self.directory.to_string_lossy()
            );
            contains_error = true;
        }

        match check_executable(&self.program()) {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    "Benchmark script {} is not executable",
                    self.program().to_string_lossy()
                );
                contains_error = true;
            }
            Err(e) => {
                warn!(
                    "Failed to check benchmark script {}: {e}",
                    self.program().to_string_lossy()
                );
                contains_error = true;
            }
        }

        contains_error
    }
}

impl Executor for LocalExecutor {
    /// run the script and wait for it, there is no timeout
    #[instrument(skip(self), fields(directory = ?self.directory), level = "info")]
    fn execute(&mut self, parameters: &BenchmarkParameters) -> Result<(), ExecutorError> {
        let command = self.command_line(parameters);

        if self.preflight_checks() {
            debug!("Preflight checks found problems, attempting to launch anyway");
        }

        info!("Running `{command}`");
        let start = Instant::now();

        let status = self
            .spawn_and_wait(parameters)
            .map_err(|source| ExecutorError::Spawn {
                command: command.clone(),
                source,
            })?;

        debug!(
            "Finished in {} s | status: {status}",
            start.elapsed().as_secs()
        );

        if status.success() {
            return Ok(());
        }

        match (status.code(), status.signal()) {
            (Some(code), _) => Err(ExecutorError::Failed { command, code }),
            (None, Some(signal)) => Err(ExecutorError::Signaled { command, signal }),
            (None, None) => Err(ExecutorError::Failed { command, code: -1 }),
        }
    }
}
