use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::WorkKey;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures raised by the pipeline building blocks.
#[derive(Debug, Error)]
pub enum Error {
    /// The ordinal cannot be computed.
    #[error("cannot compute ordinal {key}: above the supported maximum of {max}")]
    Compute { key: WorkKey, max: WorkKey },
    /// The artifact store directory is missing or cannot be used.
    #[error("artifact store `{}` is unavailable", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// No artifact exists for the key.
    #[error("no artifact found for key {key}")]
    NotFound { key: WorkKey },
    /// The artifact exists but does not hold a decimal integer.
    #[error("artifact for key {key} is not a decimal integer: {content:?}")]
    Parse { key: WorkKey, content: String },
    #[error("I/O failure on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A worker pool could not be built or lost a task.
    #[error("worker pool failure: {0}")]
    Pool(String),
    #[error("failed to start the I/O runtime")]
    Runtime(#[source] io::Error),
}

impl Error {
    /// The work key this failure is about, when it is known.
    pub fn key(&self) -> Option<WorkKey> {
        match *self {
            Error::Compute { key, .. } | Error::NotFound { key } | Error::Parse { key, .. } => Some(key),
            _ => None,
        }
    }
}
