use clap::Parser;
use serde::Deserialize;
use std::{
    env,
    ffi::OsStr,
    fs::{self, File},
    io::Error,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};

/// lock marker shared by every invocation on this machine
pub const DEFAULT_LOCK_PATH: &str = "/tmp/run-ft-benchmark.lock";
/// checkout of the repository providing the benchmark harness
pub const DEFAULT_REPO_DIR: &str = "~/nearcore";
/// benchmark entry point, relative to the repository checkout
pub const DEFAULT_SCRIPT: &str = "./scripts/start_benchmark.sh";
/// environment variable pointing to an optional YAML launcher config
pub const CONFIG_ENV: &str = "FT_BENCHMARK_CONFIG";

// check if a file is executable
pub fn check_executable(path: &Path) -> Result<bool, ConfigErrors> {
    if !path.is_file() {
        Err(ConfigErrors::FileNotFound(path.to_path_buf()))
    } else {
        match File::open(path).map(|file| file.metadata()) {
            Ok(Ok(metadata)) => Ok((metadata.mode() & 0o111) != 0),
            Ok(Err(e)) | Err(e) => Err(ConfigErrors::MetadataNotFound(e)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("Metadata not found")]
    MetadataNotFound(#[source] Error),
    #[error("Failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: Error,
    },
    #[error("Config file is not valid")]
    Parse(#[from] serde_yaml::Error),
    #[error("HOME is not set, unable to expand {0:?}")]
    HomeNotSet(PathBuf),
}

#[derive(Parser, Debug, Clone)]
#[command(name = "run-ft-benchmark", version, about = "Run FT benchmark")]
pub struct Args {
    /// Time duration (e.g., 2h, 30m, 45s)
    #[arg(long, default_value = "1h")]
    pub time: String,

    /// Number of users
    #[arg(long, default_value_t = 1000)]
    pub users: u64,

    /// Number of shards
    #[arg(long, default_value_t = 1)]
    pub shards: u64,

    /// Number of nodes
    #[arg(long, default_value_t = 1)]
    pub nodes: u64,

    /// Rump-up rate
    #[arg(long = "rump-up", visible_alias = "ramp-up", default_value_t = 10)]
    pub ramp_up: u64,

    /// User name, stored in the lock file while the benchmark runs
    #[arg(long, default_value = "unknown")]
    pub user: String,
}

impl Args {
    /// the values forwarded to the benchmark, `user` stays local
    pub fn parameters(&self) -> BenchmarkParameters {
        BenchmarkParameters {
            time: self.time.clone(),
            users: self.users,
            shards: self.shards,
            nodes: self.nodes,
            ramp_up: self.ramp_up,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkParameters {
    pub time: String,
    pub users: u64,
    pub shards: u64,
    pub nodes: u64,
    pub ramp_up: u64,
}

impl BenchmarkParameters {
    /// positional arguments in the order the benchmark script reads them
    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.time.clone(),
            self.users.to_string(),
            self.shards.to_string(),
            self.nodes.to_string(),
            self.ramp_up.to_string(),
        ]
    }
}

/// Locations the launcher works with. None of these are exposed as flags.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    #[serde(default = "default_lock_path", alias = "lock")]
    pub lock_path: PathBuf,
    #[serde(default = "default_repo_dir", alias = "repo")]
    pub repo_dir: PathBuf,
    #[serde(default = "default_script")]
    pub script: PathBuf,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            lock_path: default_lock_path(),
            repo_dir: default_repo_dir(),
            script: default_script(),
        }
    }
}

impl LauncherConfig {
    /// load the config named by `FT_BENCHMARK_CONFIG`, or the built-in defaults,
    /// with `repo_dir` resolved against `$HOME`
    pub fn load() -> Result<Self, ConfigErrors> {
        let config = match env::var_os(CONFIG_ENV) {
            Some(path) => {
                info!(path = ?path, "Loading launcher config");
                Self::from_path(Path::new(&path))?
            }
            None => {
                debug!("{CONFIG_ENV} not set, using built-in defaults");
                Self::default()
            }
        };

        config.resolve(env::var_os("HOME").as_deref())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigErrors> {
        let content = fs::read_to_string(path).map_err(|source| ConfigErrors::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigErrors> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// expand a leading `~` in `repo_dir` with `home`
    pub fn resolve(mut self, home: Option<&OsStr>) -> Result<Self, ConfigErrors> {
        self.repo_dir = expand_home(&self.repo_dir, home)?;

        Ok(self)
    }
}

fn expand_home(path: &Path, home: Option<&OsStr>) -> Result<PathBuf, ConfigErrors> {
    match path.strip_prefix("~") {
        Ok(rest) => match home {
            Some(home) if !home.is_empty() => Ok(Path::new(home).join(rest)),
            _ => Err(ConfigErrors::HomeNotSet(path.to_path_buf())),
        },
        Err(_) => Ok(path.to_path_buf()),
    }
}

fn default_lock_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOCK_PATH)
}

fn default_repo_dir() -> PathBuf {
    PathBuf::from(DEFAULT_REPO_DIR)
}

fn default_script() -> PathBuf {
    PathBuf::from(DEFAULT_SCRIPT)
}
