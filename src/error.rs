//! Error types for ook operations

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Direction of a failed backend transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Read,
    Write,
    Preallocate,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOp::Read => f.write_str("read"),
            IoOp::Write => f.write_str("write"),
            IoOp::Preallocate => f.write_str("preallocate"),
        }
    }
}

/// Main error type for volume operations
#[derive(Error, Debug)]
pub enum OokError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to open backend resource {}: {source}", .path.display())]
    BackendOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend {op} of {len} bytes at offset {offset} failed: {source}")]
    BackendIo {
        op: IoOp,
        offset: u64,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to close backend: {0}")]
    BackendClose(#[source] std::io::Error),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OokError {
    /// Shorthand for building an [`OokError::InvalidArgument`]
    pub fn invalid(msg: impl Into<String>) -> Self {
        OokError::InvalidArgument(msg.into())
    }

    /// True for errors that came back from a backend call rather than from validation
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            OokError::BackendOpen { .. } | OokError::BackendIo { .. } | OokError::BackendClose(_)
        )
    }
}

/// Specialized Result type for ook operations
pub type Result<T> = std::result::Result<T, OokError>;

impl From<serde_json::Error> for OokError {
    fn from(err: serde_json::Error) -> Self {
        OokError::Metadata(err.to_string())
    }
}
