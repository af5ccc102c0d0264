use crate::{
    config::{Args, ConfigErrors, LauncherConfig},
    executors::{
        local_test::{serialize_spawns, write_script},
        EXIT_NOT_STARTED,
    },
    run,
};
use clap::Parser;
use std::{fs, path::Path};

fn args(user: &str) -> Args {
    Args::try_parse_from(["run-ft-benchmark", "--user", user]).unwrap()
}

fn config(lock: &Path, repo: &Path) -> LauncherConfig {
    LauncherConfig {
        lock_path: lock.to_path_buf(),
        repo_dir: repo.to_path_buf(),
        ..LauncherConfig::default()
    }
}

#[test]
pub fn unresolvable_config_never_touches_lock() {
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join("run-ft-benchmark.lock");
    fs::write(&lock, "alice").unwrap();

    let unresolved = config(&lock, Path::new("~/nearcore")).resolve(None);
    assert!(matches!(unresolved, Err(ConfigErrors::HomeNotSet(_))));

    assert_eq!(run(&args("bob"), unresolved), EXIT_NOT_STARTED);
    assert_eq!(fs::read_to_string(&lock).unwrap(), "alice");
}

#[test]
pub fn invalid_config_never_creates_lock() {
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join("run-ft-benchmark.lock");
    let invalid = LauncherConfig::from_yaml(&format!(
        "lock_path: {}\nusers: 10\n",
        lock.display()
    ));

    assert_eq!(run(&args("bob"), invalid), EXIT_NOT_STARTED);
    assert!(!lock.exists());
}

#[test]
pub fn held_lock_exits_cleanly_and_is_released() {
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join("run-ft-benchmark.lock");
    fs::write(&lock, "alice").unwrap();

    assert_eq!(run(&args("bob"), Ok(config(&lock, dir.path()))), 0);
    assert!(!lock.exists());
}

#[test]
pub fn benchmark_exit_code_is_passed_through() {
    let _spawn = serialize_spawns();
    let repo = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join("run-ft-benchmark.lock");
    write_script(repo.path(), "exit 6");

    assert_eq!(run(&args("ci-bot"), Ok(config(&lock, repo.path()))), 6);
    assert!(!lock.exists());
}
