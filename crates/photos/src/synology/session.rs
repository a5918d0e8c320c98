use super::Transport;
use super::api::{
    ALBUM_API, ALBUM_VERSION, AUTH_API, AUTH_VERSION, FOLDER_API, FOLDER_VERSION, FolderData, ITEM_API, ITEM_VERSION,
    ListData, TEAM_FOLDER_API, TEAM_FOLDER_VERSION, WireAlbum, WireFolder, WireItem,
};
use crate::error::Result;
use crate::models::{AlbumId, AlbumMetadata, FolderId, RemoteFolder, RemoteItem};
use crate::service::Session;
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// One logged-in Synology user.
pub struct SynologySession {
    transport: Arc<Transport>,
    username: String,
    sid: String,
}
impl SynologySession {
    pub(super) fn new(transport: Arc<Transport>, username: &str, sid: String) -> Self {
        Self { transport, username: username.to_string(), sid }
    }

    fn params(&self, api: &'static str, version: u32, method: &str) -> Vec<(&'static str, String)> {
        vec![
            ("api", api.to_string()),
            ("version", version.to_string()),
            ("method", method.to_string()),
            ("_sid", self.sid.clone()),
        ]
    }

    /// Lazily walk a listing call page by page. The sequence ends after the
    /// first page shorter than the page size, or at the first error.
    fn paginate<'a, W, T>(
        &'a self,
        api: &'static str,
        version: u32,
        extra: Vec<(&'static str, String)>,
    ) -> BoxStream<'a, Result<T>>
    where
        W: DeserializeOwned + Into<T> + Send + 'a,
        T: Send + 'a,
    {
        let limit = self.transport.options().page_size.max(1);
        Box::pin(stream! {
            let mut offset: u64 = 0;
            loop {
                let mut params = self.params(api, version, "list");
                params.extend(extra.iter().cloned());
                params.push(("offset", offset.to_string()));
                params.push(("limit", limit.to_string()));
                let page = match self.transport.call::<ListData<W>>(&params).await.and_then(|e| e.into_data(api)) {
                    Ok(page) => page.list,
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                };
                let count = page.len();
                tracing::trace!(api, offset, count, "Fetched page");
                for entry in page {
                    yield Ok(entry.into());
                }
                if count < limit as usize {
                    break;
                }
                offset += count as u64;
            }
        })
    }

    /// Fetch the root of a folder tree (`method=get` without an id).
    async fn root(&self, api: &'static str, version: u32) -> Result<RemoteFolder> {
        let params = self.params(api, version, "get");
        let data: FolderData = self.transport.call::<FolderData>(&params).await?.into_data(api)?;
        Ok(data.folder.into())
    }

    fn children(&self, api: &'static str, version: u32, parent: Option<FolderId>) -> BoxStream<'_, Result<RemoteFolder>> {
        match parent {
            Some(id) => self.paginate::<WireFolder, _>(api, version, vec![("id", id.to_string())]),
            // Listing needs an explicit id, so resolve the root first.
            None => Box::pin(stream! {
                match self.root(api, version).await {
                    Ok(root) => {
                        let mut children = self.children(api, version, Some(root.id));
                        while let Some(child) = children.next().await {
                            yield child;
                        }
                    },
                    Err(e) => yield Err(e),
                }
            }),
        }
    }
}

#[async_trait]
impl Session for SynologySession {
    fn username(&self) -> &str {
        &self.username
    }

    async fn root_folder(&self) -> Result<RemoteFolder> {
        self.root(FOLDER_API, FOLDER_VERSION).await
    }

    fn list_folders(&self, parent: Option<FolderId>) -> BoxStream<'_, Result<RemoteFolder>> {
        self.children(FOLDER_API, FOLDER_VERSION, parent)
    }

    async fn team_root_folder(&self) -> Result<RemoteFolder> {
        self.root(TEAM_FOLDER_API, TEAM_FOLDER_VERSION).await
    }

    fn list_team_folders(&self, parent: Option<FolderId>) -> BoxStream<'_, Result<RemoteFolder>> {
        self.children(TEAM_FOLDER_API, TEAM_FOLDER_VERSION, parent)
    }

    fn list_albums(&self) -> BoxStream<'_, Result<AlbumMetadata>> {
        self.paginate::<WireAlbum, _>(ALBUM_API, ALBUM_VERSION, Vec::new())
    }

    fn list_album_items(&self, album: AlbumId) -> BoxStream<'_, Result<RemoteItem>> {
        self.paginate::<WireItem, _>(ITEM_API, ITEM_VERSION, vec![("album_id", album.to_string())])
    }

    async fn logout(&self) -> Result<()> {
        let mut params = self.params(AUTH_API, AUTH_VERSION, "logout");
        params.push(("session", self.transport.options().session_name.clone()));
        self.transport.call::<serde_json::Value>(&params).await?.check(AUTH_API)?;
        tracing::debug!(username = %self.username, "Logged out");
        Ok(())
    }
}
