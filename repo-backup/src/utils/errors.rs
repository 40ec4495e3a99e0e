//! Error taxonomy for planning, remote access and local transfers.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Not authenticated: no credential available")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict on {path}: {detail}")]
    Conflict { path: String, detail: String },

    #[error("Local I/O error on {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Remote I/O error: {0}")]
    RemoteIo(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Discriminant of [`SyncError`], for classifying failures without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    NotFound,
    Conflict,
    LocalIo,
    RemoteIo,
    InvalidInput,
}

impl SyncError {
    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::LocalIo {
            path: path.into(),
            source,
        }
    }

    pub fn conflict(path: impl Into<String>, detail: impl Into<String>) -> Self {
        SyncError::Conflict {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Unauthenticated => ErrorKind::Unauthenticated,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::Conflict { .. } => ErrorKind::Conflict,
            SyncError::LocalIo { .. } => ErrorKind::LocalIo,
            // A payload we cannot decode came off the wire
            SyncError::RemoteIo(_) | SyncError::Decode(_) | SyncError::Serialization(_) => {
                ErrorKind::RemoteIo
            }
            SyncError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::RemoteIo(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
