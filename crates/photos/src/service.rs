//! The seam between albumlink and the remote photo service.

use crate::error::Result;
use crate::models::{AlbumId, AlbumMetadata, Credentials, FolderId, RemoteFolder, RemoteItem};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// A shareable handle to an authenticated [`Session`].
pub type SessionHandle = Arc<dyn Session>;

/// A photo service that users authenticate against.
#[async_trait]
pub trait PhotoService: Send + Sync {
    /// Name of the service, used for logging only.
    fn name(&self) -> &str;

    /// Open a new session for one user.
    ///
    /// # Errors
    /// [`Auth`](crate::error::ErrorKind::Auth) if the credentials are
    /// rejected, [`Network`](crate::error::ErrorKind::Network) if the service
    /// couldn't be reached.
    async fn authenticate(&self, username: &str, credentials: &Credentials) -> Result<SessionHandle>;
}

/// An authenticated session belonging to exactly one user.
///
/// Listing calls return lazy, finite sequences that fetch pages on demand. A
/// sequence can't be restarted; call the method again for a fresh one. Any
/// `Err` item ends the sequence.
#[async_trait]
pub trait Session: Send + Sync {
    fn username(&self) -> &str;

    /// The root of the user's personal photo space.
    async fn root_folder(&self) -> Result<RemoteFolder>;

    /// Direct children of `parent`, or of the root folder when `None`.
    fn list_folders(&self, parent: Option<FolderId>) -> BoxStream<'_, Result<RemoteFolder>>;

    /// The root of the shared (team) space.
    ///
    /// # Errors
    /// Fails with [`Api`](crate::error::ErrorKind::Api) when the service has
    /// no shared space or the user may not browse it.
    async fn team_root_folder(&self) -> Result<RemoteFolder>;

    /// Direct children of `parent` in the shared space, or of its root when
    /// `None`.
    fn list_team_folders(&self, parent: Option<FolderId>) -> BoxStream<'_, Result<RemoteFolder>>;

    /// Every album owned by or shared with the user.
    fn list_albums(&self) -> BoxStream<'_, Result<AlbumMetadata>>;

    fn list_album_items(&self, album: AlbumId) -> BoxStream<'_, Result<RemoteItem>>;

    /// End the session. Errors are reported but the session is unusable
    /// afterwards either way.
    async fn logout(&self) -> Result<()>;
}
