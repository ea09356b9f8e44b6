/// Error types for the TreeSpider core.
///
/// Two families live here:
///
/// - [`SpiderError`]: returned to the caller. Only caller misuse (bad root,
///   bad query, bad config) and archive I/O produce one.
/// - [`FailureKind`] / [`FailureCause`]: tags for failures the scanner
///   *recovers from*. They end up in the report's error list and on
///   placeholder nodes, never in a `Result`.
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpiderError {
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid size value: {0:?}")]
    InvalidSize(String),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Could not build worker pool: {0}")]
    ThreadPool(String),

    #[error("Scan thread terminated unexpectedly")]
    ScanThread,

    #[error("Failed to write archive {path}: {source}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read archive {path}: {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed archive {path}: {source}")]
    ArchiveFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Archive version mismatch: expected {expected}, got {found}")]
    ArchiveVersion { expected: u32, found: u32 },

    #[error("CSV export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("Invalid configuration in {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SpiderError>;

/// Which stage of the pipeline a recovered failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Listing a directory failed.
    EnumerationFailure,
    /// Inspecting a single entry (stat, readlink) failed.
    StatFailure,
    /// The deep content sniffer errored; classification degraded.
    ClassificationFailure,
    /// Compressing, decompressing or parsing an archive failed.
    SerializationFailure,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::EnumerationFailure => "EnumerationFailure",
            Self::StatFailure => "StatFailure",
            Self::ClassificationFailure => "ClassificationFailure",
            Self::SerializationFailure => "SerializationFailure",
        }
    }

    /// Map a caller-facing error to its taxonomy slot, if it has one.
    pub fn of(err: &SpiderError) -> Option<Self> {
        match err {
            SpiderError::ArchiveWrite { .. }
            | SpiderError::ArchiveRead { .. }
            | SpiderError::ArchiveFormat { .. }
            | SpiderError::ArchiveVersion { .. } => Some(Self::SerializationFailure),
            _ => None,
        }
    }
}

/// The underlying reason for a recovered failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCause {
    PermissionDenied,
    NotFound,
    NotADirectory,
    Interrupted,
    /// The subtree scan panicked and was caught at its parent.
    Panicked,
    Other,
}

impl FailureCause {
    pub fn label(self) -> &'static str {
        match self {
            Self::PermissionDenied => "PermissionDenied",
            Self::NotFound => "NotFound",
            Self::NotADirectory => "NotADirectory",
            Self::Interrupted => "Interrupted",
            Self::Panicked => "Panicked",
            Self::Other => "Other",
        }
    }
}

impl From<&io::Error> for FailureCause {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::NotADirectory => Self::NotADirectory,
            io::ErrorKind::Interrupted => Self::Interrupted,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
