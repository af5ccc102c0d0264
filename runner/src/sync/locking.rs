use std::{
    fs::{self, OpenOptions},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, error, instrument};

/// reported when a marker disappears between the failed create and the read
const UNKNOWN_HOLDER: &str = "unknown";

#[derive(Error, Debug)]
pub enum LockError {
    #[error("benchmark already running, held by {holder}")]
    AlreadyRunning { holder: String },
    #[error("Somebody already removed the lock file {path:?}")]
    AlreadyRemoved { path: PathBuf },
    #[error("Failed to access lock file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Advisory lock, a file whose content names the current holder.
///
/// Holding the lock means the file exists. Creation is exclusive, so two
/// invocations racing for the same path can't both succeed.
#[derive(Debug, Clone)]
pub struct LockMarker {
    path: PathBuf,
}

impl LockMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// identity stored in the marker, `None` if nobody holds it
    pub fn holder(&self) -> Result<Option<String>, LockError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content.trim().to_owned())),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.io_error(source)),
        }
    }

    /// create the marker with `identity` as its content, rejecting if it exists
    #[instrument(skip(self), fields(path = ?self.path), level = "debug")]
    pub fn acquire(&self, identity: &str) -> Result<(), LockError> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                file.write_all(identity.as_bytes())
                    .map_err(|source| self.io_error(source))?;
                debug!("Acquired lock file");

                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::AlreadyExists => Err(self.rejection()?),
            Err(source) => Err(self.io_error(source)),
        }
    }

    /// the error for a marker found in place, the holder may have released meanwhile
    pub(crate) fn rejection(&self) -> Result<LockError, LockError> {
        let holder = self
            .holder()?
            .unwrap_or_else(|| UNKNOWN_HOLDER.to_owned());

        Ok(LockError::AlreadyRunning { holder })
    }

    /// delete the marker, a missing marker is an error
    #[instrument(skip(self), fields(path = ?self.path), level = "debug")]
    pub fn release(&self) -> Result<(), LockError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Released lock file");

                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Err(LockError::AlreadyRemoved {
                path: self.path.clone(),
            }),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> LockError {
        LockError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Releases a marker exactly once, through `finish` or on drop
#[derive(Debug)]
pub struct ReleaseGuard<'a> {
    marker: &'a LockMarker,
    armed: bool,
}

impl<'a> ReleaseGuard<'a> {
    pub fn new(marker: &'a LockMarker) -> Self {
        Self {
            marker,
            armed: true,
        }
    }

    pub fn finish(mut self) -> Result<(), LockError> {
        self.armed = false;
        self.marker.release()
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        match self.marker.release() {
            Ok(()) => debug!(path = ?self.marker.path(), "Released lock file on unwind"),
            Err(error) => error!(error = ?error, "Failed to release lock file: {error}"),
        }
    }
}
