//! Local filesystem storage backend.
//!
//! This module provides the backend that writes the actual symlink farm.
//! Paths are relative to a configured output directory and accessed using
//! `tokio::fs` for async I/O.

use crate::error::ErrorKind;
use crate::{Entry, StorageBackend, error::Result, path::validate as validate_path};
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Suffix for the temporary link created while atomically replacing a stale one.
const REPLACE_SUFFIX: &str = ".albumlink-tmp";

/// Local filesystem storage backend.
///
/// Maintains the link tree in a directory on the local filesystem. All paths
/// are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use albumlink_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/srv/photos-by-album")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory of the output tree
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the output root directory
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it'll only happen once on start-up and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }

        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path for a relative storage path.
    ///
    /// Validates the path and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists(path.to_path_buf()),
            // Some component of the path is a regular file.
            std::io::ErrorKind::NotADirectory => ErrorKind::AlreadyExists(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    #[cfg(unix)]
    async fn make_link(target: &Path, link: &Path) -> std::io::Result<()> {
        fs::symlink(target, link).await
    }

    /// Windows tells file and directory links apart. A target that can't be
    /// inspected (an unmounted photo root, say) is linked as a file.
    #[cfg(windows)]
    async fn make_link(target: &Path, link: &Path) -> std::io::Result<()> {
        match fs::metadata(target).await {
            Ok(metadata) if metadata.is_dir() => fs::symlink_dir(target, link).await,
            _ => fs::symlink_file(target, link).await,
        }
    }

    #[cfg(not(any(unix, windows)))]
    async fn make_link(_target: &Path, _link: &Path) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "symbolic links are not supported"))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn inspect(&self, path: &Path) -> Result<Option<Entry>> {
        let abs_path = self.absolute_path(path)?;
        let metadata = match fs::symlink_metadata(&abs_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            // A parent component is a regular file: nothing can exist below it.
            Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => return Ok(None),
            Err(e) => exn::bail!(Self::map_io_error(e, path)),
        };
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            let target = fs::read_link(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
            return Ok(Some(Entry::Link(target)));
        }
        if file_type.is_dir() {
            return Ok(Some(Entry::Directory));
        }
        Ok(Some(Entry::File))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::create_dir_all(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        let abs_path = self.absolute_path(link)?;
        match Self::make_link(target, &abs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::Unsupported => {
                exn::bail!(ErrorKind::Unsupported(format!("symlink {}", link.display())))
            },
            Err(e) => exn::bail!(Self::map_io_error(e, link)),
        }
    }

    async fn replace_link(&self, target: &Path, link: &Path) -> Result<()> {
        let abs_path = self.absolute_path(link)?;
        let file_name = abs_path
            .file_name()
            .ok_or_else(|| exn::Exn::from(ErrorKind::InvalidPath(link.to_path_buf())))?
            .to_string_lossy()
            .into_owned();
        let staging = abs_path.with_file_name(format!(".{file_name}{REPLACE_SUFFIX}"));
        // Leftovers from an interrupted run would make the symlink call fail.
        match fs::remove_file(&staging).await {
            Ok(()) => tracing::debug!(path = %staging.display(), "Removed stale staging link"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => exn::bail!(Self::map_io_error(e, link)),
        }
        Self::make_link(target, &staging).await.map_err(|e| Self::map_io_error(e, link))?;
        // rename(2) over an existing link swaps it in a single step.
        Ok(fs::rename(&staging, &abs_path).await.map_err(|e| Self::map_io_error(e, link))?)
    }
}
