use crate::collect::error::{ErrorKind as CollectErrorKind, Result as CollectResult};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::retry::{RetryPolicy, with_retry};
use crate::{Context, Summary, User};
use albumlink_cache::{FolderCache, FolderRecord, SHARED_SPACE};
use albumlink_photos::error::{Error as PhotoError, Result as PhotoResult};
use albumlink_photos::{PhotoService, RemoteFolder, Session};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::pin::pin;

/// Progress events emitted by [`collect`].
///
/// For every user, [`UserStarted`](Self::UserStarted) comes first, then one
/// [`Folder`](Self::Folder) per discovered folder (parents always before
/// their children, the root first), then [`UserComplete`](Self::UserComplete).
/// A user that is aborted yields an `Err` instead of `UserComplete`.
///
/// With a shared root configured, the first user able to browse the shared
/// space walks it right after their own tree: more `Folder` events (owned by
/// [`SHARED_SPACE`]) followed by [`SharedComplete`](Self::SharedComplete).
pub enum CollectEvent {
    Started,
    UserStarted { user: u32, username: String },
    Folder(FolderRecord),
    UserComplete {
        user: u32,
        folders: usize,
        /// `false` if at least one subtree couldn't be listed.
        complete: bool,
    },
    SharedComplete {
        /// Whose session walked the shared space.
        user: u32,
        folders: usize,
        complete: bool,
    },
    Complete,
}

/// Which folder tree a walk lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Space {
    Personal,
    Shared,
}

/// One step of a [`walk`].
enum Step {
    Folder(FolderRecord),
    /// Listing the children of `folder` failed after every retry.
    Failed { folder: u64, error: PhotoError },
}

/// Streams the folder trees of every user in `users`, in order.
pub fn collect<'a>(
    service: &'a dyn PhotoService,
    users: &'a [User],
    ctx: &'a Context,
) -> impl Stream<Item = LibraryResult<CollectEvent>> + 'a {
    stream! {
        for await event in collect_inner(service, users, ctx) {
            yield event.or_raise(|| LibraryErrorKind::Collect);
        }
    }
}

fn collect_inner<'a>(
    service: &'a dyn PhotoService,
    users: &'a [User],
    ctx: &'a Context,
) -> impl Stream<Item = CollectResult<CollectEvent>> + 'a {
    stream!({
        yield Ok(CollectEvent::Started);
        tracing::info!(
            service = service.name(),
            users = users.len(),
            shared = ctx.shared_root.is_some(),
            "Collecting folders"
        );
        let mut shared_pending = ctx.shared_root.is_some();

        for user in users {
            yield Ok(CollectEvent::UserStarted { user: user.index, username: user.username.clone() });
            tracing::info!(user = user.index, username = %user.username, "Walking personal space");

            let session = match with_retry(&ctx.retry, "login", || {
                service.authenticate(&user.username, &user.credentials)
            })
            .await
            {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(user = user.index, error = %*e, "Login failed; skipping user");
                    yield Err(e.raise(CollectErrorKind::UserAborted(user.index)));
                    continue;
                },
            };

            let root = match with_retry(&ctx.retry, "root folder", || session.root_folder()).await {
                Ok(root) => root,
                Err(e) => {
                    tracing::warn!(user = user.index, error = %*e, "Root folder unavailable; skipping user");
                    logout(session.as_ref()).await;
                    yield Err(e.raise(CollectErrorKind::UserAborted(user.index)));
                    continue;
                },
            };

            let mut folders = 0;
            let mut complete = true;
            let mut aborted = false;
            for await step in walk(session.as_ref(), Space::Personal, user.index, root, ctx) {
                match step {
                    Step::Folder(record) => {
                        folders += 1;
                        yield Ok(CollectEvent::Folder(record));
                    },
                    Step::Failed { error, .. } if error.is_auth() => {
                        tracing::warn!(user = user.index, "Session rejected mid-walk; skipping user");
                        aborted = true;
                        yield Err(error.raise(CollectErrorKind::UserAborted(user.index)));
                        break;
                    },
                    Step::Failed { folder, error } => {
                        tracing::warn!(user = user.index, folder, error = %*error, "Subtree incomplete");
                        complete = false;
                        yield Err(error.raise(CollectErrorKind::Incomplete { user: user.index, folder }));
                    },
                }
            }
            if aborted {
                logout(session.as_ref()).await;
                continue;
            }
            tracing::info!(user = user.index, folders, complete, "Folders collected");
            yield Ok(CollectEvent::UserComplete { user: user.index, folders, complete });

            if shared_pending {
                let root = match with_retry(&ctx.retry, "shared root folder", || session.team_root_folder()).await {
                    Ok(root) => Some(root),
                    Err(e) => {
                        tracing::warn!(user = user.index, error = %*e, "Shared space unavailable to user");
                        yield Err(e.raise(CollectErrorKind::SharedUnavailable(user.index)));
                        None
                    },
                };
                if let Some(root) = root {
                    let mut folders = 0;
                    let mut complete = true;
                    let mut aborted = false;
                    for await step in walk(session.as_ref(), Space::Shared, SHARED_SPACE, root, ctx) {
                        match step {
                            Step::Folder(record) => {
                                folders += 1;
                                yield Ok(CollectEvent::Folder(record));
                            },
                            Step::Failed { error, .. } if error.is_auth() => {
                                tracing::warn!(user = user.index, "Session rejected while walking the shared space");
                                aborted = true;
                                yield Err(error.raise(CollectErrorKind::SharedUnavailable(user.index)));
                                break;
                            },
                            Step::Failed { folder, error } => {
                                tracing::warn!(folder, error = %*error, "Shared subtree incomplete");
                                complete = false;
                                yield Err(error.raise(CollectErrorKind::Incomplete { user: SHARED_SPACE, folder }));
                            },
                        }
                    }
                    if !aborted {
                        tracing::info!(user = user.index, folders, complete, "Shared folders collected");
                        shared_pending = false;
                        yield Ok(CollectEvent::SharedComplete { user: user.index, folders, complete });
                    }
                }
            }
            logout(session.as_ref()).await;
        }

        yield Ok(CollectEvent::Complete);
    })
}

/// Breadth-first walk of one folder tree, `root` first. Sibling subtrees are
/// listed concurrently. Failed listings are yielded as [`Step::Failed`] and the
/// walk carries on; consumers stop polling to abandon it.
fn walk<'a>(
    session: &'a dyn Session,
    space: Space,
    owner: u32,
    root: RemoteFolder,
    ctx: &'a Context,
) -> impl Stream<Item = Step> + 'a {
    stream! {
        let root = FolderRecord::root(owner, root.id).with_owner(root.owner);
        let mut seen = HashSet::from([root.id]);
        let mut pending = VecDeque::from([root.clone()]);
        yield Step::Folder(root);

        let mut processing = FuturesUnordered::new();
        loop {
            while processing.len() < ctx.concurrency()
                && let Some(next) = pending.pop_front()
            {
                processing.push(expand(session, space, &ctx.retry, next));
            }
            let Some((parent, listing)) = processing.next().await else {
                break;
            };
            match listing {
                Ok(children) => {
                    for child in children {
                        if !seen.insert(child.id) {
                            tracing::debug!(owner, folder = child.id, "Folder listed twice; ignoring");
                            continue;
                        }
                        if child.parent.is_some_and(|p| p != parent.id) {
                            tracing::debug!(
                                owner,
                                folder = child.id,
                                parent = parent.id,
                                "Folder reports a different parent than the folder it was listed under"
                            );
                        }
                        let record =
                            FolderRecord::child(owner, child.id, parent.id, child.path).with_owner(child.owner);
                        pending.push_back(record.clone());
                        yield Step::Folder(record);
                    }
                },
                Err(error) => yield Step::Failed { folder: parent.id, error },
            }
        }
    }
}

/// List the children of one folder, retrying transient failures.
async fn expand(
    session: &dyn Session,
    space: Space,
    retry: &RetryPolicy,
    folder: FolderRecord,
) -> (FolderRecord, PhotoResult<Vec<RemoteFolder>>) {
    let id = folder.id;
    let listing = with_retry(retry, "list folders", || {
        let children = match space {
            Space::Personal => session.list_folders(Some(id)),
            Space::Shared => session.list_team_folders(Some(id)),
        };
        children.try_collect::<Vec<_>>()
    })
    .await;
    (folder, listing)
}

pub(crate) async fn logout(session: &dyn Session) {
    if let Err(e) = session.logout().await {
        tracing::debug!(username = session.username(), error = %*e, "Logout failed");
    }
}

/// The folder cache and run summary produced by [`build_cache`].
pub struct CollectReport {
    pub cache: FolderCache,
    pub summary: Summary,
    /// Owners (user indexes, or [`SHARED_SPACE`]) whose tree may be missing
    /// folders: aborted users, incomplete walks, and a shared space nobody
    /// could browse.
    pub partial: BTreeSet<u32>,
}
impl CollectReport {
    /// Fill the gaps left by partial walks with the records of a previous
    /// cache, so a flaky run doesn't forget folders it failed to reach.
    /// Fresh records always win.
    pub fn carry_forward(&mut self, prior: &FolderCache) {
        for &owner in &self.partial {
            let carried = self.cache.carry_forward(prior, owner);
            if carried > 0 {
                tracing::info!(owner, carried, "Kept folders from the previous cache");
            }
            self.summary.folders_carried += carried;
        }
    }
}

/// Drive [`collect`] to completion and assemble the folder cache.
///
/// An owner's folders are only committed once their walk finishes, so an
/// aborted user contributes nothing. Incomplete subtrees are counted but the
/// folders that were reached are kept.
pub async fn build_cache(service: &dyn PhotoService, users: &[User], ctx: &Context) -> CollectReport {
    let mut cache = FolderCache::new();
    let mut summary = Summary::default();
    let mut partial = BTreeSet::new();
    let mut staged: BTreeMap<u32, Vec<FolderRecord>> = BTreeMap::new();
    let mut shared_collected = false;

    let mut events = pin!(collect_inner(service, users, ctx));
    while let Some(event) = events.next().await {
        match event {
            Ok(CollectEvent::UserStarted { user, .. }) => {
                staged.remove(&user);
                staged.remove(&SHARED_SPACE);
            },
            Ok(CollectEvent::Folder(record)) => staged.entry(record.user).or_default().push(record),
            Ok(CollectEvent::UserComplete { user, complete, .. }) => {
                summary.users_processed += 1;
                commit(&mut cache, &mut summary, staged.remove(&user).unwrap_or_default());
                summary.folders += cache.count_for(user);
                if !complete {
                    partial.insert(user);
                }
            },
            Ok(CollectEvent::SharedComplete { complete, .. }) => {
                shared_collected = true;
                commit(&mut cache, &mut summary, staged.remove(&SHARED_SPACE).unwrap_or_default());
                summary.folders += cache.count_for(SHARED_SPACE);
                if !complete {
                    partial.insert(SHARED_SPACE);
                }
            },
            Ok(CollectEvent::Started | CollectEvent::Complete) => {},
            Err(e) => match &*e {
                CollectErrorKind::UserAborted(user) => {
                    summary.users_failed += 1;
                    partial.insert(*user);
                    staged.remove(user);
                },
                CollectErrorKind::Incomplete { .. } => summary.incomplete_folders += 1,
                CollectErrorKind::SharedUnavailable(_) => {
                    summary.warnings += 1;
                    staged.remove(&SHARED_SPACE);
                },
            },
        }
    }
    if ctx.shared_root.is_some() && !shared_collected {
        tracing::warn!("No user could browse the shared space");
        partial.insert(SHARED_SPACE);
    }
    CollectReport { cache, summary, partial }
}

fn commit(cache: &mut FolderCache, summary: &mut Summary, records: Vec<FolderRecord>) {
    for record in records {
        let key = record.key();
        if let Err(e) = cache.insert(record) {
            tracing::warn!(folder = %key, error = %*e, "Folder rejected from cache");
            summary.warnings += 1;
        }
    }
}
