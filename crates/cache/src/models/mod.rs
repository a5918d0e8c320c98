mod file;
mod folder;

pub(crate) use self::file::{CacheFile, FORMAT_VERSION};
pub use self::folder::{FolderKey, FolderRecord, SHARED_SPACE};
