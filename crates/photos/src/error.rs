//! Photo Service Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A photo service error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for photo service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Per-user Errors
/// - [`ErrorKind::Auth`]: credentials rejected or session gone; retrying with
///   the same session never helps.
///
/// ### Per-call Errors
/// - [`ErrorKind::Network`]: transport failure or server-side hiccup, safe to
///   retry with backoff.
/// - [`ErrorKind::Api`]: the service answered with an error code.
/// - [`ErrorKind::InvalidResponse`]: the service answered with something we
///   couldn't decode.
///
/// ### Setup Errors
/// - [`ErrorKind::Client`]: the HTTP client couldn't be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum ErrorKind {
    #[display("authentication failed")]
    Auth,
    #[display("network error")]
    Network,
    #[display("service returned error code {_0}")]
    Api(#[error(not(source))] i64),
    #[display("invalid response from service")]
    InvalidResponse,
    #[display("could not construct HTTP client")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Returns `true` if the failure invalidates the whole user session.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }
}
