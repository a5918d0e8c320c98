//! The albumlink pipeline.
//!
//! A migration runs in two phases, each exposed as a stream of progress events
//! plus a folding helper that drives the stream to completion:
//!
//! 1. [`collect`] walks every user's remote folder tree and produces a
//!    [`FolderCache`](albumlink_cache::FolderCache) ([`build_cache`]).
//! 2. [`albums`] enumerates every user's albums and resolves their items
//!    against the cache, and [`link`] turns the result into a tree of
//!    symbolic links on a [`StorageBackend`](albumlink_storage::backend::StorageBackend)
//!    ([`create_links`]).
//!
//! Failures local to one user or one item are yielded as `Err` items and never
//! end a stream; the folding helpers classify them into a [`Summary`].

pub mod albums;
pub mod collect;
pub mod error;
pub mod link;
mod retry;
mod summary;

pub use crate::collect::{CollectReport, build_cache};
pub use crate::link::{LinkReport, create_links};
pub use crate::retry::RetryPolicy;
pub use crate::summary::{RunStatus, Summary};
use albumlink_photos::Credentials;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum number of remote calls (or album directories) in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// One configured account.
///
/// `index` is the user's position in the configuration. It addresses the
/// user's records in the folder cache and names the `users/<index>` link, so
/// it must stay stable between the cache and link runs.
#[derive(Debug, Clone)]
pub struct User {
    pub index: u32,
    pub username: String,
    pub credentials: Credentials,
    /// Where this user's photo space is mounted locally.
    pub photo_root: PathBuf,
}

/// What to do when albums of different users share a year and a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Share `albums/<year>/<name>`, disambiguating colliding filenames.
    #[default]
    Merge,
    /// Give every user their own `albums/<year>/<name> [<index>]`.
    Split,
}

/// Knobs shared by every phase of a run.
#[derive(Debug, Clone)]
pub struct Context {
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub merge: MergePolicy,
    /// Prefer a year found at the start of the album name over its creation
    /// date.
    pub year_from_name: bool,
    /// Local mount of the shared (team) space. When set, the shared folder
    /// tree is cached and album items stored there are linked too.
    pub shared_root: Option<PathBuf>,
}
impl Default for Context {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            merge: MergePolicy::default(),
            year_from_name: true,
            shared_root: None,
        }
    }
}
impl Context {
    /// Concurrency, clamped so a misconfigured zero can't stall a run.
    pub(crate) fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
