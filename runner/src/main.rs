mod config;
mod executors;
mod launcher;
mod sync;

#[cfg(test)]
mod main_test;

use clap::Parser;
use config::{Args, ConfigErrors, LauncherConfig};
use executors::{LocalExecutor, EXIT_NOT_STARTED};
use launcher::Launcher;
use std::process::ExitCode;
use sync::LockMarker;
use tracing::{debug, error};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout belongs to the benchmark
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// one launcher attempt, returns the process exit code
fn run(args: &Args, config: Result<LauncherConfig, ConfigErrors>) -> u8 {
    let config = match config {
        Ok(config) => config,
        Err(error) => {
            error!(error = ?error, "Failed to load launcher config: {error}");

            return EXIT_NOT_STARTED;
        }
    };

    let executor = LocalExecutor::load(&config);

    debug!(
        lock = ?config.lock_path,
        directory = ?executor.directory(),
        user = %args.user,
        "Starting benchmark launcher"
    );

    Launcher::new(LockMarker::new(&config.lock_path), executor)
        .run(&args.user, &args.parameters())
        .exit_code()
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    ExitCode::from(run(&args, LauncherConfig::load()))
}
