//! Error types for the [`link`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A link error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for link operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies a failed link.
///
/// ### Operational Errors
/// - [`ErrorKind::Conflict`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Something other than a symbolic link occupies the path; it's left
    /// alone and only this item fails.
    #[display("conflict: {} is not a symbolic link", _0.display())]
    Conflict(#[error(not(source))] PathBuf),
    /// A storage backend operation on the path failed.
    #[display("storage error at {}", _0.display())]
    Storage(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
