//! Folder cache for albumlink.
//!
//! The cache is the hand-off between the two phases of a migration: the
//! folder walk (which needs every user's credentials and a reachable NAS)
//! and the link builder (which only needs this file). It maps every remote
//! folder, keyed by `(user index, folder id)`, to its path relative to that
//! user's photo root.
//!
//! # Architecture
//! - [`FolderRecord`]: one remote folder, with its parent linkage. Folders
//!   of the shared space are cached under [`SHARED_SPACE`].
//! - [`FolderCache`]: the ordered, validated set of records. Every non-root
//!   record's parent is present (no orphans).
//! - [`CacheStore`]: loads and atomically saves the cache as pretty-printed
//!   JSON, so successive caches diff cleanly.

mod cache;
pub mod error;
mod models;
mod store;

pub use crate::cache::FolderCache;
pub use crate::models::{FolderKey, FolderRecord, SHARED_SPACE};
pub use crate::store::CacheStore;
