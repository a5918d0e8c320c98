//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No cache artifact exists yet; build one first.
    #[display("cache file not found: {}", _0.display())]
    Missing(#[error(not(source))] PathBuf),
    /// The cache artifact exists but can't be trusted; rebuild it.
    #[display("cache file is corrupt: {}", _0.display())]
    Corrupt(#[error(not(source))] PathBuf),
    /// The records themselves violate a cache invariant.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] String),
    #[display("I/O error")]
    Io,
    #[display("cache serialization error")]
    Serialize,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
