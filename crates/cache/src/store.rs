use crate::FolderCache;
use crate::error::{ErrorKind, Result};
use crate::models::{CacheFile, FORMAT_VERSION};
use exn::ResultExt;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Location of the cache artifact on disk.
///
/// Saving writes a temporary file next to the destination and renames it into
/// place, so a crash mid-write never leaves a truncated cache behind and the
/// previous cache stays intact until the new one is complete.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}
impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically replace the cache artifact with `cache`.
    #[instrument(skip(self, cache), fields(path = %self.path.display(), folders = cache.len()))]
    pub fn save(&self, cache: &FolderCache) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).or_raise(|| ErrorKind::Io)?;

        let temp = NamedTempFile::new_in(dir).or_raise(|| ErrorKind::Io)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, &CacheFile::from(cache)).or_raise(|| ErrorKind::Serialize)?;
            writer.write_all(b"\n").or_raise(|| ErrorKind::Io)?;
            writer.flush().or_raise(|| ErrorKind::Io)?;
        }
        temp.as_file().sync_all().or_raise(|| ErrorKind::Io)?;
        temp.persist(&self.path).map_err(|e| e.error).or_raise(|| ErrorKind::Io)?;
        tracing::debug!("Folder cache saved");
        Ok(())
    }

    /// Load and validate the cache artifact.
    ///
    /// # Errors
    /// - [`ErrorKind::Missing`] if no artifact exists at the path.
    /// - [`ErrorKind::Corrupt`] if it can't be parsed, was written by an
    ///   incompatible version, or violates the cache invariants.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<FolderCache> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::NotFound => exn::bail!(ErrorKind::Missing(self.path.clone())),
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
        };
        let contents: CacheFile = serde_json::from_reader(BufReader::new(file))
            .or_raise(|| ErrorKind::Serialize)
            .or_raise(|| ErrorKind::Corrupt(self.path.clone()))?;
        if contents.version != FORMAT_VERSION {
            tracing::warn!(found = contents.version, expected = FORMAT_VERSION, "Unsupported cache format version");
            exn::bail!(ErrorKind::Corrupt(self.path.clone()));
        }
        let cache = FolderCache::from_records(contents.folders).or_raise(|| ErrorKind::Corrupt(self.path.clone()))?;
        tracing::debug!(folders = cache.len(), "Folder cache loaded");
        Ok(cache)
    }
}
