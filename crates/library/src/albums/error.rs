//! Error types for the [`albums`](super) module.

use derive_more::{Display, Error};

/// An album enumeration error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for album enumeration.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The user couldn't be authenticated or their albums couldn't be listed.
    #[display("user {_0} aborted")]
    UserAborted(#[error(not(source))] u32),
    /// The items of `album` couldn't be listed after every retry; the album
    /// is skipped.
    #[display("album {album} of user {user} is incomplete")]
    Incomplete { user: u32, album: u64 },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }
}
