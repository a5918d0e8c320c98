//! Error types for the [`collect`](super) module.

use derive_more::{Display, Error};

/// A collect error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for collect operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why part of the folder walk was skipped.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The user couldn't be authenticated (or their root couldn't be read);
    /// nothing was collected for them.
    #[display("user {_0} aborted")]
    UserAborted(#[error(not(source))] u32),
    /// Listing the children of `folder` failed after every retry. The folder
    /// itself is cached, its subtree isn't. `user` is
    /// [`SHARED_SPACE`](albumlink_cache::SHARED_SPACE) for the shared tree.
    #[display("subtree of folder {folder} (user {user}) is incomplete")]
    Incomplete { user: u32, folder: u64 },
    /// The shared space couldn't be walked from this user's session. Another
    /// user's session is tried next.
    #[display("shared space unavailable to user {_0}")]
    SharedUnavailable(#[error(not(source))] u32),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }
}
