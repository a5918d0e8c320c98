use crate::albums::error::{ErrorKind as AlbumsErrorKind, Result as AlbumsResult};
use crate::albums::year::{AlbumYear, derive_year};
use crate::collect::logout;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::retry::with_retry;
use crate::{Context, User};
use albumlink_cache::{FolderCache, SHARED_SPACE};
use albumlink_photos::{AlbumMetadata, PhotoService, RemoteItem, Session};
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt, TryStreamExt};
use std::path::PathBuf;

/// An album item whose folder was found in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub filename: String,
    pub folder_id: u64,
    /// Whose tree the folder was found in: the album's user, or
    /// [`SHARED_SPACE`].
    pub owner: u32,
    /// The folder's path relative to the owner's photo root.
    pub relative_path: PathBuf,
}

/// One album of one user, ready to be laid out as links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumRecord {
    pub user: u32,
    pub album_id: u64,
    pub name: String,
    pub year: AlbumYear,
    pub items: Vec<ResolvedItem>,
}

/// Progress events emitted by [`albums`].
pub enum AlbumEvent {
    Started,
    UserStarted { user: u32, username: String },
    Album(AlbumRecord),
    /// An item whose folder isn't in the cache. No link is created for it.
    Unresolved { user: u32, album: String, filename: String, folder: u64 },
    /// An item owned by a different account than the folder it was found in.
    /// It is linked regardless.
    OwnerMismatch { user: u32, album: String, filename: String },
    UserComplete { user: u32, albums: usize },
    Complete,
}

/// Streams the albums of every user in `users`, with items resolved against
/// `cache`.
pub fn albums<'a>(
    service: &'a dyn PhotoService,
    users: &'a [User],
    cache: &'a FolderCache,
    ctx: &'a Context,
) -> impl Stream<Item = LibraryResult<AlbumEvent>> + 'a {
    stream! {
        for await event in albums_inner(service, users, cache, ctx) {
            yield event.or_raise(|| LibraryErrorKind::Albums);
        }
    }
}

pub(crate) fn albums_inner<'a>(
    service: &'a dyn PhotoService,
    users: &'a [User],
    cache: &'a FolderCache,
    ctx: &'a Context,
) -> impl Stream<Item = AlbumsResult<AlbumEvent>> + 'a {
    stream!({
        yield Ok(AlbumEvent::Started);

        for user in users {
            yield Ok(AlbumEvent::UserStarted { user: user.index, username: user.username.clone() });
            tracing::info!(user = user.index, username = %user.username, "Enumerating albums");

            let session = match with_retry(&ctx.retry, "login", || {
                service.authenticate(&user.username, &user.credentials)
            })
            .await
            {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(user = user.index, error = %*e, "Login failed; skipping user");
                    yield Err(e.raise(AlbumsErrorKind::UserAborted(user.index)));
                    continue;
                },
            };

            let listing = with_retry(&ctx.retry, "list albums", || session.list_albums().try_collect::<Vec<_>>()).await;
            let metadata = match listing {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(user = user.index, error = %*e, "Albums unavailable; skipping user");
                    logout(session.as_ref()).await;
                    yield Err(e.raise(AlbumsErrorKind::UserAborted(user.index)));
                    continue;
                },
            };
            tracing::debug!(user = user.index, albums = metadata.len(), "Albums listed");

            let handle: &dyn Session = session.as_ref();
            let mut fetches = futures::stream::iter(metadata)
                .map(move |album| {
                    let session = handle;
                    async move {
                        let id = album.id;
                        let items = with_retry(&ctx.retry, "list album items", || {
                            session.list_album_items(id).try_collect::<Vec<_>>()
                        })
                        .await;
                        (album, items)
                    }
                })
                .buffered(ctx.concurrency());

            let mut count = 0;
            let mut aborted = false;
            while let Some((album, items)) = fetches.next().await {
                let items = match items {
                    Ok(items) => items,
                    Err(e) if e.is_auth() => {
                        tracing::warn!(user = user.index, "Session rejected while listing album items; skipping user");
                        aborted = true;
                        yield Err(e.raise(AlbumsErrorKind::UserAborted(user.index)));
                        break;
                    },
                    Err(e) => {
                        tracing::warn!(user = user.index, album = %album.name, error = %*e, "Album items unavailable; skipping album");
                        yield Err(e.raise(AlbumsErrorKind::Incomplete { user: user.index, album: album.id }));
                        continue;
                    },
                };

                let (record, unresolved, mismatched) = resolve(user, &album, items, cache, ctx);
                for filename in mismatched {
                    tracing::warn!(
                        user = user.index,
                        album = %album.name,
                        filename = %filename,
                        "Item owner differs from its folder's owner"
                    );
                    yield Ok(AlbumEvent::OwnerMismatch { user: user.index, album: album.name.clone(), filename });
                }
                for item in unresolved {
                    tracing::warn!(
                        user = user.index,
                        album = %album.name,
                        filename = %item.filename,
                        folder = item.folder_id,
                        "Item folder not in cache; no link created"
                    );
                    yield Ok(AlbumEvent::Unresolved {
                        user: user.index,
                        album: album.name.clone(),
                        filename: item.filename,
                        folder: item.folder_id,
                    });
                }
                count += 1;
                yield Ok(AlbumEvent::Album(record));
            }
            drop(fetches);
            logout(session.as_ref()).await;

            if !aborted {
                tracing::info!(user = user.index, albums = count, "Albums enumerated");
                yield Ok(AlbumEvent::UserComplete { user: user.index, albums: count });
            }
        }

        yield Ok(AlbumEvent::Complete);
    })
}

/// Split an album's items into those resolvable against the cache and those
/// that aren't. Items are looked up in the user's own tree first, then in the
/// shared tree when one is configured. The filenames of personal items whose
/// owner doesn't match their folder's are returned too.
fn resolve(
    user: &User,
    album: &AlbumMetadata,
    items: Vec<RemoteItem>,
    cache: &FolderCache,
    ctx: &Context,
) -> (AlbumRecord, Vec<RemoteItem>, Vec<String>) {
    let mut resolved = Vec::with_capacity(items.len());
    let mut unresolved = Vec::new();
    let mut mismatched = Vec::new();
    for item in items {
        let found = cache.get(user.index, item.folder_id).map(|folder| (user.index, folder)).or_else(|| {
            ctx.shared_root.as_ref().and_then(|_| cache.get(SHARED_SPACE, item.folder_id)).map(|f| (SHARED_SPACE, f))
        });
        let Some((owner, folder)) = found else {
            unresolved.push(item);
            continue;
        };
        if owner != SHARED_SPACE
            && let (Some(item_owner), Some(folder_owner)) = (item.owner, folder.owner)
            && item_owner != folder_owner
        {
            mismatched.push(item.filename.clone());
        }
        resolved.push(ResolvedItem {
            filename: item.filename,
            folder_id: item.folder_id,
            owner,
            relative_path: folder.relative_path(),
        });
    }
    let record = AlbumRecord {
        user: user.index,
        album_id: album.id,
        name: album.name.clone(),
        year: derive_year(&album.name, album.create_time, ctx.year_from_name),
        items: resolved,
    };
    (record, unresolved, mismatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryPolicy;
    use albumlink_cache::FolderRecord;
    use albumlink_photos::Credentials;
    use albumlink_photos::error::ErrorKind as PhotoErrorKind;
    use albumlink_photos::mock::{MockAccount, MockService};
    use std::path::Path;
    use std::time::Duration;

    const CHRISTMAS_21: i64 = 1_640_390_400;

    fn user(index: u32, username: &str) -> User {
        User {
            index,
            username: username.to_string(),
            credentials: Credentials::new("secret"),
            photo_root: PathBuf::from("/Volumes/photo"),
        }
    }

    fn ctx() -> Context {
        Context {
            retry: RetryPolicy { attempts: 2, initial_backoff: Duration::ZERO, max_backoff: Duration::ZERO },
            ..Context::default()
        }
    }

    fn cache() -> FolderCache {
        let mut cache = FolderCache::new();
        cache.insert(FolderRecord::root(0, 1)).unwrap();
        cache.insert(FolderRecord::child(0, 2, 1, vec!["Pictures".into()])).unwrap();
        cache.insert(FolderRecord::child(0, 3, 2, vec!["Pictures".into(), "2021".into()])).unwrap();
        cache
    }

    fn records(events: Vec<AlbumsResult<AlbumEvent>>) -> (Vec<AlbumRecord>, usize, usize) {
        let (mut albums, mut unresolved, mut errors) = (Vec::new(), 0, 0);
        for event in events {
            match event {
                Ok(AlbumEvent::Album(record)) => albums.push(record),
                Ok(AlbumEvent::Unresolved { .. }) => unresolved += 1,
                Ok(_) => {},
                Err(_) => errors += 1,
            }
        }
        (albums, unresolved, errors)
    }

    #[tokio::test]
    async fn test_resolves_items() {
        let account = MockAccount::new("alice", "secret", 1).album(
            7,
            "Weihnachten 21",
            Some(CHRISTMAS_21),
            [("img1.jpg", 3), ("lost.jpg", 99), ("img2.jpg", 3)],
        );
        let service = MockService::new().with_account(account);
        let (users, cache, ctx) = ([user(0, "alice")], cache(), ctx());
        let events: Vec<_> = albums_inner(&service, &users, &cache, &ctx).collect().await;
        let (albums, unresolved, errors) = records(events);
        assert_eq!((unresolved, errors), (1, 0));
        assert_eq!(albums.len(), 1);
        let album = &albums[0];
        assert_eq!(album.year, AlbumYear::Known(2021));
        let names: Vec<_> = album.items.iter().map(|i| i.filename.as_str()).collect();
        assert_eq!(names, vec!["img1.jpg", "img2.jpg"]);
        assert_eq!(album.items[0].relative_path, Path::new("Pictures/2021"));
        assert_eq!(service.logouts(), 1);
    }

    #[tokio::test]
    async fn test_missing_timestamp_is_unknown_year() {
        let account = MockAccount::new("alice", "secret", 1).album(7, "Urlaub", None, [("a.jpg", 2)]);
        let service = MockService::new().with_account(account);
        let (users, cache, ctx) = ([user(0, "alice")], cache(), ctx());
        let events: Vec<_> = albums_inner(&service, &users, &cache, &ctx).collect().await;
        let (albums, _, _) = records(events);
        assert_eq!(albums[0].year, AlbumYear::Unknown);
    }

    #[tokio::test]
    async fn test_failed_album_is_skipped() {
        let account = MockAccount::new("alice", "secret", 1)
            .album(7, "Broken", Some(CHRISTMAS_21), [("a.jpg", 2)])
            .album(8, "Fine", Some(CHRISTMAS_21), [("b.jpg", 2)])
            .fail_album(7, PhotoErrorKind::Network, 5);
        let service = MockService::new().with_account(account);
        let (users, cache, ctx) = ([user(0, "alice")], cache(), ctx());
        let events: Vec<_> = albums_inner(&service, &users, &cache, &ctx).collect().await;
        let incomplete = events.iter().filter(|e| matches!(e, Err(e) if matches!(&**e, AlbumsErrorKind::Incomplete { album: 7, .. }))).count();
        assert_eq!(incomplete, 1);
        let (albums, _, _) = records(events);
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].name, "Fine");
    }

    #[tokio::test]
    async fn test_album_listing_failure_aborts_user() {
        let account = MockAccount::new("alice", "secret", 1)
            .album(7, "Fine", Some(CHRISTMAS_21), [("b.jpg", 2)])
            .fail_albums(PhotoErrorKind::Api(500), 1);
        let service = MockService::new()
            .with_account(account)
            .with_account(MockAccount::new("bob", "secret", 1).album(9, "Bob", None, [("c.jpg", 1)]));
        let (users, ctx) = ([user(0, "alice"), user(1, "bob")], ctx());
        let mut cache = cache();
        cache.insert(FolderRecord::root(1, 1)).unwrap();
        let events: Vec<_> = albums_inner(&service, &users, &cache, &ctx).collect().await;
        assert!(events.iter().any(|e| matches!(e, Err(e) if matches!(&**e, AlbumsErrorKind::UserAborted(0)))));
        let (albums, _, _) = records(events);
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].user, 1);
    }

    #[tokio::test]
    async fn test_resolves_shared_items() {
        let account = MockAccount::new("alice", "secret", 1).album(
            7,
            "Sommerfest",
            Some(CHRISTMAS_21),
            [("own.jpg", 3), ("team.jpg", 501)],
        );
        let service = MockService::new().with_account(account);
        let users = [user(0, "alice")];
        let mut cache = cache();
        cache.insert(FolderRecord::root(SHARED_SPACE, 500)).unwrap();
        cache.insert(FolderRecord::child(SHARED_SPACE, 501, 500, vec!["Events".into()])).unwrap();

        let shared = Context { shared_root: Some(PathBuf::from("/Volumes/shared")), ..ctx() };
        let events: Vec<_> = albums_inner(&service, &users, &cache, &shared).collect().await;
        let (albums, unresolved, _) = records(events);
        assert_eq!(unresolved, 0);
        let team = &albums[0].items[1];
        assert_eq!((team.owner, team.relative_path.as_path()), (SHARED_SPACE, Path::new("Events")));
        assert_eq!(albums[0].items[0].owner, 0);

        // Without a shared root the shared tree is never consulted.
        let ctx = ctx();
        let events: Vec<_> = albums_inner(&service, &users, &cache, &ctx).collect().await;
        let (_, unresolved, _) = records(events);
        assert_eq!(unresolved, 1);
    }

    #[tokio::test]
    async fn test_owner_mismatch_is_reported_and_linked() {
        let account = MockAccount::new("alice", "secret", 1)
            .album(7, "Fremd", Some(CHRISTMAS_21), [("a.jpg", 3)])
            .owned_by(42)
            .album(8, "Eigen", Some(CHRISTMAS_21), [("b.jpg", 2)]);
        let service = MockService::new().with_account(account);
        let users = [user(0, "alice")];
        let mut cache = FolderCache::new();
        cache.insert(FolderRecord::root(0, 1).with_owner(Some(5))).unwrap();
        cache.insert(FolderRecord::child(0, 2, 1, vec!["Pictures".into()]).with_owner(Some(5))).unwrap();
        cache.insert(FolderRecord::child(0, 3, 2, vec!["Pictures".into(), "2021".into()]).with_owner(Some(5))).unwrap();

        let ctx = ctx();
        let events: Vec<_> = albums_inner(&service, &users, &cache, &ctx).collect().await;
        let mismatched: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Ok(AlbumEvent::OwnerMismatch { filename, .. }) => Some(filename.as_str()),
                _ => None,
            })
            .collect();
        // b.jpg has no owner recorded, so there is nothing to compare.
        assert_eq!(mismatched, vec!["a.jpg"]);
        let (albums, _, errors) = records(events);
        assert_eq!(errors, 0);
        assert_eq!(albums.iter().map(|a| a.items.len()).sum::<usize>(), 2);
    }
}
