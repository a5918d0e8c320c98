use super::action::{Action, ensure_link};
use super::plan::{DirectoryPlan, LinkPlan, plan};
use crate::albums::error::ErrorKind as AlbumsErrorKind;
use crate::albums::{AlbumEvent, albums_inner};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::link::error::{ErrorKind as LinkErrorKind, Result as LinkResult};
use crate::{Context, Summary, User};
use albumlink_cache::FolderCache;
use albumlink_photos::PhotoService;
use albumlink_storage::BackendHandle;
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use std::path::Path;
use std::pin::pin;

/// Progress events emitted by [`link`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) and [`Planned`](Self::Planned), once each.
/// 2. [`UserLinked`](Self::UserLinked), one per user.
/// 3. [`Linked`](Self::Linked), one per album item, interleaved across
///    directories.
/// 4. [`Complete`](Self::Complete), once.
///
/// Failed links are yielded as `Err` items in place of their event.
pub enum LinkEvent {
    Started,
    Planned { directories: usize, links: usize },
    UserLinked(Action),
    Linked(Action),
    Complete,
}

/// Apply `plan` to `backend`.
///
/// Up to [`Context::concurrency`](crate::Context) album directories are
/// processed at once, each by a single task that creates the directory and
/// then its links in order.
pub fn link<'a>(
    backend: &'a BackendHandle,
    plan: &'a LinkPlan,
    ctx: &'a Context,
) -> impl Stream<Item = LibraryResult<LinkEvent>> + 'a {
    stream! {
        for await event in link_inner(backend, plan, ctx) {
            yield event.or_raise(|| LibraryErrorKind::Link);
        }
    }
}

fn link_inner<'a>(
    backend: &'a BackendHandle,
    plan: &'a LinkPlan,
    ctx: &'a Context,
) -> impl Stream<Item = LinkResult<LinkEvent>> + 'a {
    stream!({
        yield Ok(LinkEvent::Started);
        yield Ok(LinkEvent::Planned { directories: plan.directories.len(), links: plan.links() });

        if !plan.users.is_empty() {
            let users = Path::new("users");
            match backend.create_dir_all(users).await {
                Ok(()) => {
                    for user in &plan.users {
                        yield ensure_link(backend.as_ref(), &user.target, &user.link).await.map(LinkEvent::UserLinked);
                    }
                },
                Err(e) => yield Err(e.raise(LinkErrorKind::Storage(users.to_path_buf()))),
            }
        }

        let directories = futures::stream::iter(&plan.directories)
            .map(|directory| Box::pin(link_directory(backend, directory)))
            .flatten_unordered(ctx.concurrency());
        for await result in directories {
            yield result.map(LinkEvent::Linked);
        }

        yield Ok(LinkEvent::Complete);
    })
}

/// Create one album directory and its links. The directory's links are only
/// ever written from here, one after the other.
fn link_directory<'a>(
    backend: &'a BackendHandle,
    directory: &'a DirectoryPlan,
) -> impl Stream<Item = LinkResult<Action>> + 'a {
    stream! {
        if let Err(e) = backend.create_dir_all(&directory.path).await {
            yield Err(e.raise(LinkErrorKind::Storage(directory.path.clone())));
            return;
        }
        for planned in &directory.links {
            yield ensure_link(backend.as_ref(), &planned.target, &planned.link).await;
        }
    }
}

/// The outcome of [`create_links`].
pub struct LinkReport {
    pub summary: Summary,
    pub plan: LinkPlan,
}

/// Enumerate every user's albums, plan the tree and apply it to `backend`.
pub async fn create_links(
    service: &dyn PhotoService,
    users: &[User],
    cache: &FolderCache,
    backend: &BackendHandle,
    ctx: &Context,
) -> LinkReport {
    let mut summary = Summary::default();
    let mut records = Vec::new();

    let mut events = pin!(albums_inner(service, users, cache, ctx));
    while let Some(event) = events.next().await {
        match event {
            Ok(AlbumEvent::Album(record)) => {
                summary.albums += 1;
                records.push(record);
            },
            Ok(AlbumEvent::Unresolved { .. } | AlbumEvent::OwnerMismatch { .. }) => summary.warnings += 1,
            Ok(AlbumEvent::UserComplete { .. }) => summary.users_processed += 1,
            Ok(AlbumEvent::Started | AlbumEvent::UserStarted { .. } | AlbumEvent::Complete) => {},
            Err(e) => match &*e {
                AlbumsErrorKind::UserAborted(_) => summary.users_failed += 1,
                AlbumsErrorKind::Incomplete { .. } => summary.incomplete_albums += 1,
            },
        }
    }

    let plan = plan(users, ctx.shared_root.as_deref(), records, ctx.merge);
    summary.duplicates = plan.duplicates;
    tracing::info!(directories = plan.directories.len(), links = plan.links(), backend = backend.name(), "Linking");

    {
        let mut events = pin!(link_inner(backend, &plan, ctx));
        while let Some(event) = events.next().await {
            match event {
                Ok(LinkEvent::UserLinked(action) | LinkEvent::Linked(action)) => match action {
                    Action::Created(_) => summary.links_created += 1,
                    Action::Unchanged(_) => summary.links_unchanged += 1,
                    Action::Replaced(_) => summary.links_replaced += 1,
                },
                Ok(LinkEvent::Started | LinkEvent::Planned { .. } | LinkEvent::Complete) => {},
                Err(e) => match &*e {
                    LinkErrorKind::Conflict(path) => {
                        tracing::warn!(path = %path.display(), "Path occupied by something other than a link; skipped");
                        summary.conflicts += 1;
                    },
                    LinkErrorKind::Storage(path) => {
                        tracing::warn!(path = %path.display(), error = ?e, "Link could not be written");
                        summary.failures += 1;
                    },
                },
            }
        }
    }

    LinkReport { summary, plan }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryPolicy;
    use albumlink_cache::FolderRecord;
    use albumlink_photos::Credentials;
    use albumlink_photos::mock::{MockAccount, MockService};
    use albumlink_storage::Entry;
    use albumlink_storage::backend::{MockBackend, ReadOnlyBackend};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    const CHRISTMAS_21: i64 = 1_640_390_400;
    const CHRISTMAS_24: i64 = 1_735_084_800;

    fn user(index: u32, username: &str, root: &str) -> User {
        User {
            index,
            username: username.to_string(),
            credentials: Credentials::new("secret"),
            photo_root: PathBuf::from(root),
        }
    }

    fn ctx() -> Context {
        Context {
            retry: RetryPolicy { attempts: 2, initial_backoff: Duration::ZERO, max_backoff: Duration::ZERO },
            ..Context::default()
        }
    }

    fn cache(users: u32) -> FolderCache {
        let mut cache = FolderCache::new();
        for user in 0..users {
            cache.insert(FolderRecord::root(user, 1)).unwrap();
            cache.insert(FolderRecord::child(user, 2, 1, vec!["Pictures".into()])).unwrap();
            cache.insert(FolderRecord::child(user, 3, 2, vec!["Pictures".into(), "2021".into()])).unwrap();
        }
        cache
    }

    fn scenario() -> (MockService, [User; 1]) {
        let account = MockAccount::new("alice", "secret", 1).album(
            7,
            "Weihnachten 21",
            Some(CHRISTMAS_21),
            [("img1.jpg", 3), ("gone.jpg", 42)],
        );
        (MockService::new().with_account(account), [user(0, "alice", "/Volumes/photo")])
    }

    fn handle(mock: &Arc<MockBackend>) -> BackendHandle {
        mock.clone()
    }

    #[tokio::test]
    async fn test_scenario() {
        let (service, users) = scenario();
        let mock = Arc::new(MockBackend::default());
        let report = create_links(&service, &users, &cache(1), &handle(&mock), &ctx()).await;

        let links = mock.links().await;
        assert_eq!(links.len(), 2);
        assert_eq!(links[Path::new("users/0")], Path::new("/Volumes/photo"));
        assert_eq!(
            links[Path::new("albums/2021/Weihnachten 21/img1.jpg")],
            Path::new("/Volumes/photo/Pictures/2021/img1.jpg")
        );
        // The unresolvable item is a warning, not a link.
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.summary.links_created, 2);
        assert_eq!(report.summary.albums, 1);
        assert_eq!(report.summary.users_processed, 1);
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let (service, users) = scenario();
        let mock = Arc::new(MockBackend::default());
        let (cache, ctx) = (cache(1), ctx());
        create_links(&service, &users, &cache, &handle(&mock), &ctx).await;
        let writes = mock.writes();

        let report = create_links(&service, &users, &cache, &handle(&mock), &ctx).await;
        assert_eq!(mock.writes(), writes);
        assert_eq!(report.summary.writes(), 0);
        assert_eq!(report.summary.links_unchanged, 2);
    }

    #[tokio::test]
    async fn test_stale_links_replaced_and_conflicts_reported() {
        let account = MockAccount::new("alice", "secret", 1).album(
            7,
            "Weihnachten 21",
            Some(CHRISTMAS_21),
            [("img1.jpg", 3), ("img2.jpg", 3), ("img3.jpg", 3)],
        );
        let service = MockService::new().with_account(account);
        let users = [user(0, "alice", "/Volumes/photo")];
        let mock = Arc::new(MockBackend::with_entries([
            ("users/0", Entry::Link("/Volumes/old".into())),
            ("albums/2021/Weihnachten 21/img1.jpg", Entry::Link("/Volumes/old/img1.jpg".into())),
            ("albums/2021/Weihnachten 21/img2.jpg", Entry::File),
        ]));
        let report = create_links(&service, &users, &cache(1), &handle(&mock), &ctx()).await;

        assert_eq!(report.summary.links_replaced, 2);
        assert_eq!(report.summary.conflicts, 1);
        assert_eq!(report.summary.links_created, 1);
        let links = mock.links().await;
        assert_eq!(links[Path::new("users/0")], Path::new("/Volumes/photo"));
        assert!(!links.contains_key(Path::new("albums/2021/Weihnachten 21/img2.jpg")));
        assert!(links.contains_key(Path::new("albums/2021/Weihnachten 21/img3.jpg")));
    }

    #[tokio::test]
    async fn test_collision_merge() {
        let service = MockService::new()
            .with_account(MockAccount::new("alice", "secret", 1).album(
                5,
                "Weihnachten 24",
                Some(CHRISTMAS_24),
                [("img1.jpg", 3), ("a.jpg", 3)],
            ))
            .with_account(MockAccount::new("bob", "secret", 1).album(
                9,
                "Weihnachten 24",
                Some(CHRISTMAS_24),
                [("img1.jpg", 2), ("b.jpg", 2)],
            ));
        let users = [user(0, "alice", "/a"), user(1, "bob", "/b")];
        let mock = Arc::new(MockBackend::default());
        let report = create_links(&service, &users, &cache(2), &handle(&mock), &ctx()).await;

        let links = mock.links().await;
        let dir = Path::new("albums/2024/Weihnachten 24");
        assert_eq!(links[&dir.join("img1.jpg")], Path::new("/a/Pictures/2021/img1.jpg"));
        assert_eq!(links[&dir.join("img1_u1.jpg")], Path::new("/b/Pictures/img1.jpg"));
        assert_eq!(links[&dir.join("a.jpg")], Path::new("/a/Pictures/2021/a.jpg"));
        assert_eq!(links[&dir.join("b.jpg")], Path::new("/b/Pictures/b.jpg"));
        assert_eq!(report.plan.directories.len(), 1);
        assert_eq!(report.summary.links_created, 6);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let (service, users) = scenario();
        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = Arc::new(ReadOnlyBackend::new(handle(&mock)));
        let report = create_links(&service, &users, &cache(1), &backend, &ctx()).await;
        assert_eq!(mock.writes(), 0);
        assert_eq!(report.summary.links_created, 2);
    }

    #[tokio::test]
    async fn test_aborted_user_still_gets_user_link() {
        let (service, _) = scenario();
        let users = [user(0, "alice", "/Volumes/photo"), user(1, "mallory", "/Volumes/mallory")];
        let mock = Arc::new(MockBackend::default());
        let report = create_links(&service, &users, &cache(1), &handle(&mock), &ctx()).await;
        assert_eq!(report.summary.users_failed, 1);
        assert_eq!(report.summary.status(), crate::RunStatus::Partial);
        assert!(mock.links().await.contains_key(Path::new("users/1")));
    }

    #[tokio::test]
    async fn test_event_order() {
        let plan = LinkPlan::default();
        let mock = Arc::new(MockBackend::default());
        let (backend, ctx) = (handle(&mock), ctx());
        let events: Vec<_> = link(&backend, &plan, &ctx).collect().await;
        assert!(matches!(events[0], Ok(LinkEvent::Started)));
        assert!(matches!(events[1], Ok(LinkEvent::Planned { directories: 0, links: 0 })));
        assert!(matches!(events[2], Ok(LinkEvent::Complete)));
    }

    #[tokio::test]
    async fn test_shared_space_items() {
        let account = MockAccount::new("alice", "secret", 1).album(
            7,
            "Sommerfest",
            Some(CHRISTMAS_21),
            [("own.jpg", 3), ("team.jpg", 501)],
        );
        let service = MockService::new().with_account(account);
        let users = [user(0, "alice", "/Volumes/photo")];
        let mut cache = cache(1);
        cache.insert(FolderRecord::root(albumlink_cache::SHARED_SPACE, 500)).unwrap();
        cache.insert(FolderRecord::child(albumlink_cache::SHARED_SPACE, 501, 500, vec!["Events".into()])).unwrap();
        let ctx = Context { shared_root: Some(PathBuf::from("/Volumes/team")), ..ctx() };
        let mock = Arc::new(MockBackend::default());
        let report = create_links(&service, &users, &cache, &handle(&mock), &ctx).await;

        let links = mock.links().await;
        assert_eq!(links[Path::new("users/shared")], Path::new("/Volumes/team"));
        assert_eq!(links[Path::new("albums/2021/Sommerfest/team.jpg")], Path::new("/Volumes/team/Events/team.jpg"));
        assert_eq!(report.summary.warnings, 0);
        assert_eq!(report.summary.links_created, 4);
    }
}
