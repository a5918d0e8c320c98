use serde::{Deserialize, Serialize};
use std::fmt;

pub type FolderId = u64;
pub type AlbumId = u64;

/// A folder as reported by the remote service.
///
/// `path` is the folder's location below the account's photo root, split into
/// segments. The root folder itself has an empty path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    pub id: FolderId,
    pub parent: Option<FolderId>,
    pub path: Vec<String>,
    /// Service-side id of the account that owns the folder.
    pub owner: Option<u64>,
}
impl RemoteFolder {
    /// Build a folder from the service's slash-separated display name
    /// (`"/Pictures/2021"`).
    pub fn from_name(id: FolderId, parent: Option<FolderId>, name: &str, owner: Option<u64>) -> Self {
        Self { id, parent, path: split_path(name), owner }
    }
}

/// Splits a remote folder name into path segments, dropping empty ones.
pub fn split_path(name: &str) -> Vec<String> {
    name.split('/').filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Metadata for one album. `create_time` is a Unix timestamp in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumMetadata {
    pub id: AlbumId,
    pub name: String,
    pub create_time: Option<i64>,
}

/// One photo or video that belongs to an album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub id: u64,
    pub filename: String,
    pub folder_id: FolderId,
    /// Service-side id of the account that owns the file. Matches the owner
    /// of its folder.
    pub owner: Option<u64>,
}

/// A user's secret. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials {
    password: String,
}
impl Credentials {
    pub fn new(password: impl Into<String>) -> Self {
        Self { password: password.into() }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(**redacted**)")
    }
}
