//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration sources could not be read or merged
    #[display("failed to load configuration")]
    Load,
    /// Configuration loaded but is unusable
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// The configured file search could not be built
    #[display("failed to build file search")]
    Files,
}
impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Load)
    }
}
