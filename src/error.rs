//! CLI Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Configuration could not be loaded or is invalid
    #[display("configuration error")]
    Config,
    /// A command-line argument could not be used
    #[display("invalid argument: {_0}")]
    Argument(#[error(not(source))] String),
    /// The scan yielded at least one error
    #[display("scan failed with {_0} error(s)")]
    Scan(#[error(not(source))] usize),
}
