//! Read-only storage backend.
//!
//! This module provides a storage backend implementation that wraps other
//! implementations and prevents write operations from executing, but
//! indicating success on return. Used for dry runs of the link builder.

use async_trait::async_trait;
use std::path::Path;

use crate::{BackendHandle, Entry, StorageBackend, error::Result};

/// Read-only storage backend.
///
/// Wraps another backend and silently drops all write operations, logging an
/// [`info event`](tracing::Event). Inspections still reach the wrapped
/// backend, so a dry run reports exactly what a real run would change.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn inspect(&self, path: &Path) -> Result<Option<Entry>> {
        self.inner.inspect(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        if self.inner.inspect(path).await?.is_none() {
            tracing::info!(path = %path.display(), "Skipping directory creation during read-only mode");
        }
        Ok(())
    }

    async fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        tracing::info!(path = %link.display(), target = %target.display(), "Skipping symlink during read-only mode");
        Ok(())
    }

    async fn replace_link(&self, target: &Path, link: &Path) -> Result<()> {
        tracing::info!(path = %link.display(), target = %target.display(), "Skipping link replacement during read-only mode");
        Ok(())
    }
}
