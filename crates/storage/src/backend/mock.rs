//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::{Entry, StorageBackend};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Entries are stored in a `BTreeMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. Every
/// mutation is counted, which lets tests assert that an idempotent run
/// performed no writes at all.
///
/// # Examples
///
/// ```
/// use albumlink_storage::backend::{MockBackend, StorageBackend};
/// use albumlink_storage::Entry;
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_entries([("albums", Entry::Directory)]);
/// backend.symlink(Path::new("/Volumes/photo/a.jpg"), Path::new("albums/a.jpg")).await.unwrap();
/// assert_eq!(backend.writes(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    entries: RwLock<BTreeMap<PathBuf, Entry>>,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with entries.
    ///
    /// Missing parent directories of the given entries are created implicitly.
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<PathBuf>, Entry)>) -> Self {
        let mut map = BTreeMap::new();
        for (path, entry) in entries {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_entries: invalid path {}", path.display());
            };
            for ancestor in validated.ancestors().skip(1).filter(|a| !a.as_os_str().is_empty()) {
                map.entry(ancestor.to_path_buf()).or_insert(Entry::Directory);
            }
            map.insert(validated, entry);
        }
        Self {
            name: "mock".to_string(),
            entries: RwLock::new(map),
            writes: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of mutations performed since construction.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of every symbolic link and its target.
    pub async fn links(&self) -> BTreeMap<PathBuf, PathBuf> {
        self.entries
            .read()
            .await
            .iter()
            .filter_map(|(path, entry)| match entry {
                Entry::Link(target) => Some((path.clone(), target.clone())),
                _ => None,
            })
            .collect()
    }

    fn parent_is_directory(map: &BTreeMap<PathBuf, Entry>, path: &Path) -> bool {
        match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            None => true,
            Some(parent) => matches!(map.get(parent), Some(Entry::Directory)),
        }
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let entries: [(&str, Entry); 0] = [];
        Self::with_entries(entries)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn inspect(&self, path: &Path) -> Result<Option<Entry>> {
        let path = validate_path(path)?;
        Ok(self.entries.read().await.get(&path).cloned())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        let mut guard = self.entries.write().await;
        let mut ancestors: Vec<_> = path.ancestors().filter(|a| !a.as_os_str().is_empty()).collect();
        ancestors.reverse();
        for ancestor in ancestors {
            match guard.get(ancestor) {
                Some(Entry::Directory) => {},
                Some(_) => exn::bail!(ErrorKind::AlreadyExists(ancestor.to_path_buf())),
                None => {
                    guard.insert(ancestor.to_path_buf(), Entry::Directory);
                    self.writes.fetch_add(1, Ordering::SeqCst);
                },
            }
        }
        Ok(())
    }

    async fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        let link = validate_path(link)?;
        let mut guard = self.entries.write().await;
        if guard.contains_key(&link) {
            exn::bail!(ErrorKind::AlreadyExists(link));
        }
        if !Self::parent_is_directory(&guard, &link) {
            exn::bail!(ErrorKind::NotFound(link));
        }
        guard.insert(link, Entry::Link(target.to_path_buf()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn replace_link(&self, target: &Path, link: &Path) -> Result<()> {
        let link = validate_path(link)?;
        let mut guard = self.entries.write().await;
        match guard.get_mut(&link) {
            Some(Entry::Link(existing)) => *existing = target.to_path_buf(),
            Some(_) => exn::bail!(ErrorKind::AlreadyExists(link)),
            None => exn::bail!(ErrorKind::NotFound(link)),
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
