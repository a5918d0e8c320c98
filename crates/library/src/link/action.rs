use crate::link::error::{ErrorKind as LinkErrorKind, Result as LinkResult};
use albumlink_storage::{Entry, StorageBackend};
use exn::ResultExt;
use std::path::{Path, PathBuf};

/// The outcome of (successfully) ensuring a single link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing existed at the path; the link was created.
    Created(PathBuf),
    /// The link already pointed at the right target; nothing was written.
    Unchanged(PathBuf),
    /// A stale link was atomically swapped for one with the right target.
    Replaced(PathBuf),
}

/// Make `link` a symbolic link to `target`, writing only when needed.
///
/// # Errors
/// - [`Conflict`](LinkErrorKind::Conflict) if a directory or regular file
///   occupies `link`. It's never removed.
/// - [`Storage`](LinkErrorKind::Storage) if the backend fails.
pub async fn ensure_link(backend: &dyn StorageBackend, target: &Path, link: &Path) -> LinkResult<Action> {
    let storage = || LinkErrorKind::Storage(link.to_path_buf());
    match backend.inspect(link).await.or_raise(storage)? {
        None => {
            backend.symlink(target, link).await.or_raise(storage)?;
            tracing::debug!(link = %link.display(), target = %target.display(), "Link created");
            Ok(Action::Created(link.to_path_buf()))
        },
        Some(entry) if entry.is_link_to(target) => Ok(Action::Unchanged(link.to_path_buf())),
        Some(Entry::Link(previous)) => {
            backend.replace_link(target, link).await.or_raise(storage)?;
            tracing::debug!(
                link = %link.display(),
                previous = %previous.display(),
                target = %target.display(),
                "Stale link replaced"
            );
            Ok(Action::Replaced(link.to_path_buf()))
        },
        Some(_) => exn::bail!(LinkErrorKind::Conflict(link.to_path_buf())),
    }
}
