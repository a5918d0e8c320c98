//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the narrow set of
//! operations needed to maintain a tree of symbolic links: inspect what
//! occupies a path, create directories, create links and atomically replace
//! stale ones. Nothing here ever follows a link or reads file contents.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
use crate::Entry;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for output tree backends.
///
/// # Path Handling
/// All paths are relative to the backend root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation. Link *targets* are stored verbatim: they usually
/// point outside the root (into a NAS mount) and are never resolved.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use albumlink_storage::{Entry, backend::StorageBackend, error::Result};
///
/// async fn ensure_link(backend: &dyn StorageBackend, link: &Path, target: &Path) -> Result<()> {
///     match backend.inspect(link).await? {
///         Some(entry) if entry.is_link_to(target) => Ok(()),
///         Some(Entry::Link(_)) => backend.replace_link(target, link).await,
///         Some(_) => panic!("something else lives at {}", link.display()),
///         None => backend.symlink(target, link).await,
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Report what occupies `path`, without following symbolic links.
    ///
    /// Returns `Ok(None)` when nothing exists at that path.
    async fn inspect(&self, path: &Path) -> Result<Option<Entry>>;

    /// Create a directory and all of its missing parents.
    ///
    /// Succeeds without writing anything if the directory already exists.
    /// Returns [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists) if
    /// a non-directory occupies `path` or one of its parents.
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Create a new symbolic link at `link` pointing at `target`.
    ///
    /// # Notes
    /// - Parent directories must already exist.
    /// - Returns [`AlreadyExists`](crate::error::ErrorKind::AlreadyExists)
    ///   if anything occupies `link`.
    /// - `target` is not validated, dereferenced or checked for existence.
    async fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Atomically replace the symbolic link at `link` so it points at `target`.
    ///
    /// Callers must have established (via [`inspect`](Self::inspect)) that
    /// `link` currently holds a symbolic link; replacing directories or
    /// regular files is never attempted.
    async fn replace_link(&self, target: &Path, link: &Path) -> Result<()>;
}
