use crate::FolderCache;
use crate::models::FolderRecord;
use serde::{Deserialize, Serialize};

/// Bumped whenever the on-disk layout changes incompatibly.
pub(crate) const FORMAT_VERSION: u32 = 1;

/// On-disk layout of the cache artifact.
///
/// Records are written as a flat, key-ordered list rather than a map so the
/// file stays readable and diffs line-by-line between runs.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CacheFile {
    pub version: u32,
    pub folders: Vec<FolderRecord>,
}
impl From<&FolderCache> for CacheFile {
    fn from(cache: &FolderCache) -> Self {
        Self {
            version: FORMAT_VERSION,
            folders: cache.iter().cloned().collect(),
        }
    }
}
