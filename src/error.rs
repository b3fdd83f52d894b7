//! Error taxonomy for a single run. Every variant except `ExtractionStream` is fatal
//! and propagates to the scheduler; `ExtractionStream` only surfaces when the run asks
//! for strict streams (see `PipelineRun::fail_on_truncated_stream`).

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// External service an authentication error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    Reddit,
    Storage,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Reddit => f.write_str("reddit"),
            Service::Storage => f.write_str("storage"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("invalid run configuration: {0}")]
    Config(String),

    /// Never carries secret material, only the reason reported by the service.
    #[error("{service} authentication failed: {reason}")]
    Authentication { service: Service, reason: String },

    #[error("extraction stream ended early after {rows} rows: {reason}")]
    ExtractionStream { rows: u64, reason: String },

    #[error("local write failed for {}", .path.display())]
    LocalWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not ensure container '{container}'")]
    ContainerEnsure {
        container: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("local file vanished before upload: {}", .path.display())]
    LocalFileMissing { path: PathBuf },

    #[error("transfer of {} to {location} failed", .path.display())]
    Transfer {
        path: PathBuf,
        location: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EtlError {
    pub(crate) fn auth(service: Service, reason: impl Into<String>) -> Self {
        EtlError::Authentication { service, reason: reason.into() }
    }

    pub(crate) fn local_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EtlError::LocalWrite { path: path.into(), source }
    }
}

pub type EtlResult<T> = std::result::Result<T, EtlError>;
