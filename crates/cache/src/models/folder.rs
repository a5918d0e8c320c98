use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Owner index under which the shared (team) space is cached, next to the
/// per-user indexes.
pub const SHARED_SPACE: u32 = u32::MAX;

/// Unique address of a folder across all users.
///
/// Remote folder ids are only unique per user account, so the user index is
/// part of the key. Ordering is by user first, which keeps the serialized
/// cache grouped by user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FolderKey {
    pub user: u32,
    pub id: u64,
}
impl fmt::Display for FolderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.id)
    }
}

/// A single remote folder, normalized for the cache.
///
/// `path` holds the folder's location relative to the owning user's photo
/// root as individual segments. The root folder has an empty path and no
/// parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub user: u32,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    pub path: Vec<String>,
    /// Service-side id of the account owning the folder, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<u64>,
}
impl FolderRecord {
    pub fn root(user: u32, id: u64) -> Self {
        Self { user, id, parent: None, path: Vec::new(), owner: None }
    }

    pub fn child(user: u32, id: u64, parent: u64, path: Vec<String>) -> Self {
        Self { user, id, parent: Some(parent), path, owner: None }
    }

    pub fn with_owner(mut self, owner: Option<u64>) -> Self {
        self.owner = owner;
        self
    }

    pub fn key(&self) -> FolderKey {
        FolderKey { user: self.user, id: self.id }
    }

    pub fn parent_key(&self) -> Option<FolderKey> {
        self.parent.map(|id| FolderKey { user: self.user, id })
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The folder's path relative to its user's photo root.
    pub fn relative_path(&self) -> PathBuf {
        self.path.iter().collect()
    }

    /// Returns the first path segment that could escape the photo root or
    /// smuggle in a separator, if any.
    pub(crate) fn invalid_segment(&self) -> Option<&str> {
        self.path
            .iter()
            .map(String::as_str)
            .find(|s| s.is_empty() || *s == "." || *s == ".." || s.contains(['/', '\0']))
    }
}
