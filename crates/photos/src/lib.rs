//! Remote session client for albumlink.
//!
//! Everything albumlink needs from the photo service goes through two traits:
//! [`PhotoService`] opens a [`Session`] for one user, and the session exposes
//! the read-only listing calls (folders one level at a time, albums, and the
//! items of an album). Nothing here ever writes to the service.
//!
//! [`SynologyPhotos`] talks to Synology Photos over its web API. With the
//! `mock` feature, [`MockService`](mock::MockService) serves a scripted
//! account from memory, including injected failures.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod models;
mod service;
mod synology;

pub use crate::models::{AlbumId, AlbumMetadata, Credentials, FolderId, RemoteFolder, RemoteItem, split_path};
pub use crate::service::{PhotoService, Session, SessionHandle};
pub use crate::synology::{SynologyOptions, SynologyPhotos};
