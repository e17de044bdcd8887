//! File and Image Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Inside a pipeline these are raised
//! into [`scry_core::ErrorKind::Source`] by the leaf that caught them.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

/// A file or image error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for file and image operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// [`is_expected`](Self::is_expected) kinds are absorbed by the leaf scanners
/// (the item is omitted); everything else goes through the scan context's
/// ignore policies.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File or directory does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// File exists but isn't a recognized binary image
    #[display("bad image format: {}", _0.display())]
    BadImageFormat(#[error(not(source))] PathBuf),
    /// Image ends before its structure does; entries read so far are kept
    #[display("truncated image: {}", _0.display())]
    Truncated(#[error(not(source))] PathBuf),
    /// Image structure is inconsistent
    #[display("malformed image {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: &'static str },
    /// Glob pattern could not be compiled
    #[display("invalid search pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    /// Image format name not recognized
    #[display("unknown image format: {_0}")]
    UnknownFormat(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl ErrorKind {
    pub(crate) fn from_io(err: IoError, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }

    /// Returns `true` for the faults a scan silently skips.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::PermissionDenied(_) | Self::BadImageFormat(_))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
