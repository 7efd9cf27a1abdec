//! Error types for transfer operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while transferring files.
///
/// A handful of variants (`Exists`, `WouldMerge`, `WouldRecurse`) are
/// signals between the layers of the engine and are normally resolved
/// before they reach the caller.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The job was cancelled.
    #[error("Operation was cancelled")]
    Cancelled,

    /// No space left on the target device.
    #[error("No space left on device: {path}")]
    NoSpace { path: PathBuf },

    /// The target already exists.
    #[error("Target already exists: {path}")]
    Exists { path: PathBuf },

    /// Copying a directory onto a directory would merge their contents.
    #[error("Would merge directories: {path}")]
    WouldMerge { path: PathBuf },

    /// Copying a directory requires creating it and copying its children.
    #[error("Can't recursively copy directory: {path}")]
    WouldRecurse { path: PathBuf },

    /// A directory is in the way of a non-directory.
    #[error("Target is a directory: {path}")]
    IsDirectory { path: PathBuf },

    /// The entry type can't be transferred (sockets, devices, fifos).
    #[error("Operation not supported for {path}")]
    NotSupported { path: PathBuf },

    /// Permission denied.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("No such file or directory: {path}")]
    NotFound { path: PathBuf },

    /// A directory can't be copied or moved into itself.
    #[error("Cannot move or copy {path} into itself ({target})")]
    SourceIsAncestor { path: PathBuf, target: PathBuf },

    /// The parent folder of a restored trash item could not be recreated.
    #[error("Failed to restore the folder \"{folder}\"")]
    RestoreFailed { folder: String },

    /// A copied file does not match its source.
    #[error("Copied file does not match the original: {path}")]
    ChecksumMismatch { path: PathBuf },

    /// Source and target lists differ in length.
    #[error("Got {sources} source paths but {targets} target paths")]
    MismatchedPairs { sources: usize, targets: usize },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// Create an error from an I/O failure, classifying well-known kinds.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::StorageFull => Self::NoSpace { path },
            io::ErrorKind::AlreadyExists => Self::Exists { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::IsADirectory => Self::IsDirectory { path },
            io::ErrorKind::Unsupported => Self::NotSupported { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether this error must abort the whole job instead of asking the user.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::NoSpace { .. })
    }

    /// Whether this error reports an existing target.
    pub fn is_exists(&self) -> bool {
        matches!(self, Self::Exists { .. })
    }

    /// Whether this error reports a cancelled job.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result alias used throughout ferry.
pub type TransferResult<T> = Result<T, TransferError>;
