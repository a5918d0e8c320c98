//! In-memory photo service for tests.
//!
//! Accounts are scripted up front with [`MockAccount`]'s builder methods,
//! including failures that trigger a fixed number of times before calls start
//! succeeding, so retry and abort paths can be exercised deterministically.

use crate::error::{ErrorKind, Result};
use crate::models::{AlbumId, AlbumMetadata, Credentials, FolderId, RemoteFolder, RemoteItem};
use crate::service::{PhotoService, Session, SessionHandle};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Target {
    Login,
    Folder(FolderId),
    TeamFolder(FolderId),
    Albums,
    Album(AlbumId),
}

/// A scripted user account.
#[derive(Debug)]
pub struct MockAccount {
    username: String,
    password: String,
    root: RemoteFolder,
    folders: Vec<RemoteFolder>,
    team: Option<RemoteFolder>,
    team_folders: Vec<RemoteFolder>,
    albums: Vec<(AlbumMetadata, Vec<RemoteItem>)>,
    failures: Mutex<HashMap<Target, (ErrorKind, u32)>>,
    folder_calls: AtomicUsize,
    next_item: u64,
}
impl MockAccount {
    pub fn new(username: impl Into<String>, password: impl Into<String>, root: FolderId) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            root: RemoteFolder { id: root, parent: None, path: Vec::new(), owner: None },
            folders: Vec::new(),
            team: None,
            team_folders: Vec::new(),
            albums: Vec::new(),
            failures: Mutex::new(HashMap::new()),
            folder_calls: AtomicUsize::new(0),
            next_item: 1,
        }
    }

    /// Add a folder below `parent`. `path` is relative to the photo root.
    pub fn folder(mut self, id: FolderId, parent: FolderId, path: &str) -> Self {
        self.folders.push(RemoteFolder::from_name(id, Some(parent), path, None));
        self
    }

    /// Give the account access to a shared space rooted at `root`.
    pub fn team_root(mut self, root: FolderId) -> Self {
        self.team = Some(RemoteFolder { id: root, parent: None, path: Vec::new(), owner: None });
        self
    }

    /// Add a shared-space folder below `parent`.
    pub fn team_folder(mut self, id: FolderId, parent: FolderId, path: &str) -> Self {
        self.team_folders.push(RemoteFolder::from_name(id, Some(parent), path, None));
        self
    }

    /// Set the owner reported for every folder and item added so far.
    pub fn owned_by(mut self, owner: u64) -> Self {
        self.root.owner = Some(owner);
        self.folders.iter_mut().for_each(|f| f.owner = Some(owner));
        self.albums.iter_mut().flat_map(|(_, items)| items.iter_mut()).for_each(|i| i.owner = Some(owner));
        self
    }

    /// Add an album holding `(filename, folder id)` items.
    pub fn album<'a>(
        mut self,
        id: AlbumId,
        name: &str,
        create_time: Option<i64>,
        items: impl IntoIterator<Item = (&'a str, FolderId)>,
    ) -> Self {
        let items: Vec<_> = items
            .into_iter()
            .map(|(filename, folder_id)| {
                self.next_item += 1;
                RemoteItem { id: self.next_item, filename: filename.to_string(), folder_id, owner: None }
            })
            .collect();
        let metadata = AlbumMetadata { id, name: name.to_string(), create_time };
        self.albums.push((metadata, items));
        self
    }

    /// Fail the next `times` logins with `kind`.
    pub fn fail_login(self, kind: ErrorKind, times: u32) -> Self {
        self.fail(Target::Login, kind, times)
    }

    /// Fail the next `times` listings of `folder`'s children with `kind`.
    pub fn fail_folder(self, folder: FolderId, kind: ErrorKind, times: u32) -> Self {
        self.fail(Target::Folder(folder), kind, times)
    }

    /// Fail the next `times` listings of shared `folder`'s children with `kind`.
    pub fn fail_team_folder(self, folder: FolderId, kind: ErrorKind, times: u32) -> Self {
        self.fail(Target::TeamFolder(folder), kind, times)
    }

    /// Fail the next `times` album listings with `kind`.
    pub fn fail_albums(self, kind: ErrorKind, times: u32) -> Self {
        self.fail(Target::Albums, kind, times)
    }

    /// Fail the next `times` item listings of `album` with `kind`.
    pub fn fail_album(self, album: AlbumId, kind: ErrorKind, times: u32) -> Self {
        self.fail(Target::Album(album), kind, times)
    }

    fn fail(self, target: Target, kind: ErrorKind, times: u32) -> Self {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).insert(target, (kind, times));
        self
    }

    fn take_failure(&self, target: Target) -> Option<ErrorKind> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        match failures.get_mut(&target) {
            Some((kind, times)) if *times > 0 => {
                *times -= 1;
                Some(*kind)
            },
            _ => None,
        }
    }
}

/// A photo service backed by [`MockAccount`]s.
#[derive(Debug, Default)]
pub struct MockService {
    accounts: HashMap<String, Arc<MockAccount>>,
    logins: AtomicUsize,
    logouts: Arc<AtomicUsize>,
}
impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: MockAccount) -> Self {
        self.accounts.insert(account.username.clone(), Arc::new(account));
        self
    }

    /// Login attempts, successful or not.
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    /// Number of folder listing calls made for `username`.
    pub fn folder_calls(&self, username: &str) -> usize {
        self.accounts.get(username).map(|a| a.folder_calls.load(Ordering::SeqCst)).unwrap_or(0)
    }
}

#[async_trait]
impl PhotoService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn authenticate(&self, username: &str, credentials: &Credentials) -> Result<SessionHandle> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        let Some(account) = self.accounts.get(username) else {
            exn::bail!(ErrorKind::Auth);
        };
        if let Some(kind) = account.take_failure(Target::Login) {
            exn::bail!(kind);
        }
        if account.password != credentials.password() {
            exn::bail!(ErrorKind::Auth);
        }
        Ok(Arc::new(MockSession {
            account: Arc::clone(account),
            logouts: Arc::clone(&self.logouts),
            logged_out: AtomicBool::new(false),
        }))
    }
}

struct MockSession {
    account: Arc<MockAccount>,
    logouts: Arc<AtomicUsize>,
    logged_out: AtomicBool,
}
impl MockSession {
    fn check(&self, target: Target) -> Result<()> {
        if self.logged_out.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Auth);
        }
        match self.account.take_failure(target) {
            Some(kind) => exn::bail!(kind),
            None => Ok(()),
        }
    }
}

fn failed<'a, T: Send + 'a>(err: crate::error::Error) -> BoxStream<'a, Result<T>> {
    stream::iter([Err(err)]).boxed()
}

#[async_trait]
impl Session for MockSession {
    fn username(&self) -> &str {
        &self.account.username
    }

    async fn root_folder(&self) -> Result<RemoteFolder> {
        self.check(Target::Folder(self.account.root.id))?;
        Ok(self.account.root.clone())
    }

    fn list_folders(&self, parent: Option<FolderId>) -> BoxStream<'_, Result<RemoteFolder>> {
        self.account.folder_calls.fetch_add(1, Ordering::SeqCst);
        let parent = parent.unwrap_or(self.account.root.id);
        if let Err(e) = self.check(Target::Folder(parent)) {
            return failed(e);
        }
        let children: Vec<_> =
            self.account.folders.iter().filter(|f| f.parent == Some(parent)).cloned().map(Ok).collect();
        stream::iter(children).boxed()
    }

    async fn team_root_folder(&self) -> Result<RemoteFolder> {
        let Some(root) = &self.account.team else {
            // What Synology answers when there is no shared space to browse.
            exn::bail!(ErrorKind::Api(642));
        };
        self.check(Target::TeamFolder(root.id))?;
        Ok(root.clone())
    }

    fn list_team_folders(&self, parent: Option<FolderId>) -> BoxStream<'_, Result<RemoteFolder>> {
        self.account.folder_calls.fetch_add(1, Ordering::SeqCst);
        let Some(parent) = parent.or(self.account.team.as_ref().map(|root| root.id)) else {
            return failed(exn::Exn::from(ErrorKind::Api(642)));
        };
        if let Err(e) = self.check(Target::TeamFolder(parent)) {
            return failed(e);
        }
        let children: Vec<_> =
            self.account.team_folders.iter().filter(|f| f.parent == Some(parent)).cloned().map(Ok).collect();
        stream::iter(children).boxed()
    }

    fn list_albums(&self) -> BoxStream<'_, Result<AlbumMetadata>> {
        if let Err(e) = self.check(Target::Albums) {
            return failed(e);
        }
        stream::iter(self.account.albums.iter().map(|(album, _)| Ok(album.clone())).collect::<Vec<_>>()).boxed()
    }

    fn list_album_items(&self, album: AlbumId) -> BoxStream<'_, Result<RemoteItem>> {
        if let Err(e) = self.check(Target::Album(album)) {
            return failed(e);
        }
        let items = self
            .account
            .albums
            .iter()
            .find(|(metadata, _)| metadata.id == album)
            .map(|(_, items)| items.iter().cloned().map(Ok).collect::<Vec<_>>())
            .unwrap_or_default();
        stream::iter(items).boxed()
    }

    async fn logout(&self) -> Result<()> {
        self.logged_out.store(true, Ordering::SeqCst);
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
