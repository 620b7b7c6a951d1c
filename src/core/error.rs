//! Defines the custom error type for the `core` and `archive` modules.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::archive::{ProcessResult, ToolKind};

/// The primary error type of the ingestion and archive pipeline.
///
/// Duplicates are not errors; they are reported as a
/// [`DedupOutcome`](super::DedupOutcome) variant.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A source path, archive or output directory was missing before an operation.
    #[error("{what} does not exist: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// No catalog record has the given id.
    #[error("No record with id {0}")]
    RecordNotFound(String),

    /// Ratings are whole stars from 1 to 5.
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    /// No installed compression tool could be located.
    #[error("Neither {} nor {} was found, please install a compression tool", ToolKind::WinRar, ToolKind::SevenZip)]
    ToolNotFound,

    /// A compression tool exited with a non-zero exit code.
    #[error("{message}")]
    ToolInvocation {
        message: String,
        result: Box<ProcessResult>,
    },

    /// Output of a registry query or tool could not be parsed.
    #[error("Failed to parse {source_name} output: {detail}")]
    Parse {
        source_name: &'static str,
        detail: String,
    },

    /// The operation requires a capability only present on Windows.
    #[error("{0} is only available on Windows")]
    UnsupportedPlatform(&'static str),

    /// A child process or query did not finish in time and was terminated.
    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// Represents an error that occurred when a Tokio task was joined.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A catalog file could not be encoded or decoded.
    #[error("Catalog serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Shorthand for wrapping an I/O error together with the path it concerns.
    pub fn io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CoreError::Io(err, path.into())
    }

    /// Returns `true` for every variant the user should read as "something is missing".
    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::NotFound { .. }
            | CoreError::ToolNotFound
            | CoreError::RecordNotFound(_) => true,
            CoreError::Io(e, _) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
