//! Wire format of the Synology web API.
//!
//! Every call goes to `webapi/entry.cgi` and answers with the same envelope:
//! `{"success": true, "data": {...}}` or `{"success": false, "error": {"code": N}}`.

use crate::error::{ErrorKind, Result};
use crate::models::{AlbumMetadata, RemoteFolder, RemoteItem};
use serde::Deserialize;

pub(super) const ENDPOINT: &str = "webapi/entry.cgi";

pub(super) const AUTH_API: &str = "SYNO.API.Auth";
pub(super) const AUTH_VERSION: u32 = 6;
pub(super) const FOLDER_API: &str = "SYNO.Foto.Browse.Folder";
pub(super) const FOLDER_VERSION: u32 = 1;
pub(super) const TEAM_FOLDER_API: &str = "SYNO.FotoTeam.Browse.Folder";
pub(super) const TEAM_FOLDER_VERSION: u32 = 1;
pub(super) const ALBUM_API: &str = "SYNO.Foto.Browse.Album";
pub(super) const ALBUM_VERSION: u32 = 2;
pub(super) const ITEM_API: &str = "SYNO.Foto.Browse.Item";
pub(super) const ITEM_VERSION: u32 = 6;

#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
}

impl<T> Envelope<T> {
    /// Unwrap the payload of a successful call.
    pub(super) fn into_data(self, api: &str) -> Result<T> {
        self.check(api)?;
        match self.data {
            Some(data) => Ok(data),
            None => exn::bail!(ErrorKind::InvalidResponse),
        }
    }

    /// Only check that the call succeeded; the payload (if any) is ignored.
    pub(super) fn check(&self, api: &str) -> Result<()> {
        match (self.success, &self.error) {
            (true, _) => Ok(()),
            (false, Some(error)) => exn::bail!(classify(api, error.code)),
            (false, None) => exn::bail!(ErrorKind::InvalidResponse),
        }
    }
}

/// Map a Synology error code onto an actionable category.
///
/// Codes 105-119 are shared by every API and mean the session is no longer
/// valid. The 400 range is only meaningful for the auth API, where it covers
/// wrong passwords, disabled accounts and two-factor prompts.
pub(super) fn classify(api: &str, code: i64) -> ErrorKind {
    match code {
        105 | 106 | 107 | 119 => ErrorKind::Auth,
        400..=410 if api == AUTH_API => ErrorKind::Auth,
        _ => ErrorKind::Api(code),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginData {
    pub sid: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct FolderData {
    pub folder: WireFolder,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListData<T> {
    pub list: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireFolder {
    id: u64,
    name: String,
    #[serde(default)]
    parent: Option<u64>,
    #[serde(default)]
    owner_user_id: Option<u64>,
}
impl From<WireFolder> for RemoteFolder {
    fn from(folder: WireFolder) -> Self {
        // The root reports its parent as 0.
        let parent = folder.parent.filter(|id| *id != 0);
        RemoteFolder::from_name(folder.id, parent, &folder.name, folder.owner_user_id)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireAlbum {
    id: u64,
    name: String,
    #[serde(default)]
    create_time: Option<i64>,
}
impl From<WireAlbum> for AlbumMetadata {
    fn from(album: WireAlbum) -> Self {
        Self { id: album.id, name: album.name, create_time: album.create_time }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireItem {
    id: u64,
    filename: String,
    folder_id: u64,
    #[serde(default)]
    owner_user_id: Option<u64>,
}
impl From<WireItem> for RemoteItem {
    fn from(item: WireItem) -> Self {
        Self { id: item.id, filename: item.filename, folder_id: item.folder_id, owner: item.owner_user_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AUTH_API, 400, ErrorKind::Auth)]
    #[case(AUTH_API, 403, ErrorKind::Auth)]
    #[case(FOLDER_API, 119, ErrorKind::Auth)]
    #[case(ALBUM_API, 106, ErrorKind::Auth)]
    #[case(ITEM_API, 400, ErrorKind::Api(400))]
    #[case(FOLDER_API, 641, ErrorKind::Api(641))]
    #[case(TEAM_FOLDER_API, 105, ErrorKind::Auth)]
    fn test_classify(#[case] api: &str, #[case] code: i64, #[case] expected: ErrorKind) {
        assert_eq!(classify(api, code), expected);
    }

    #[test]
    fn test_login_success() {
        let json = r#"{"success": true, "data": {"sid": "abc", "did": "x"}}"#;
        let envelope: Envelope<LoginData> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.into_data(AUTH_API).unwrap().sid, "abc");
    }

    #[test]
    fn test_login_rejected() {
        let json = r#"{"success": false, "error": {"code": 400}}"#;
        let envelope: Envelope<LoginData> = serde_json::from_str(json).unwrap();
        let err = envelope.into_data(AUTH_API).unwrap_err();
        assert_eq!(*err, ErrorKind::Auth);
    }

    #[test]
    fn test_success_without_data() {
        let json = r#"{"success": true}"#;
        let envelope: Envelope<ListData<WireItem>> = serde_json::from_str(json).unwrap();
        assert!(envelope.check(ITEM_API).is_ok());
        assert_eq!(*envelope.into_data(ITEM_API).unwrap_err(), ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_folder_list() {
        let json = r#"{"success": true, "data": {"list": [
            {"id": 12, "name": "/Pictures/2021", "owner_user_id": 3, "parent": 5, "passphrase": "", "shared": false}
        ]}}"#;
        let envelope: Envelope<ListData<WireFolder>> = serde_json::from_str(json).unwrap();
        let folders: Vec<RemoteFolder> = envelope.into_data(FOLDER_API).unwrap().list.into_iter().map(Into::into).collect();
        assert_eq!(folders, vec![RemoteFolder {
            id: 12,
            parent: Some(5),
            path: vec!["Pictures".into(), "2021".into()],
            owner: Some(3),
        }]);
    }

    #[test]
    fn test_root_folder() {
        let json = r#"{"success": true, "data": {"folder": {"id": 1, "name": "/", "owner_user_id": 3, "parent": 0}}}"#;
        let envelope: Envelope<FolderData> = serde_json::from_str(json).unwrap();
        let root = RemoteFolder::from(envelope.into_data(FOLDER_API).unwrap().folder);
        assert_eq!(root.parent, None);
        assert!(root.path.is_empty());
    }

    #[test]
    fn test_album_and_item() {
        let album: WireAlbum =
            serde_json::from_str(r#"{"id": 7, "name": "Weihnachten 21", "create_time": 1640390400, "item_count": 2}"#)
                .unwrap();
        let album = AlbumMetadata::from(album);
        assert_eq!(album.create_time, Some(1640390400));
        let item: WireItem =
            serde_json::from_str(r#"{"id": 99, "filename": "img1.jpg", "folder_id": 12, "owner_user_id": 3}"#).unwrap();
        let item = RemoteItem::from(item);
        assert_eq!((item.folder_id, item.owner), (12, Some(3)));
    }
}
