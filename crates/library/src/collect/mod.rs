//! Folder Cache Builder.
//!
//! Walks each user's remote folder tree breadth first. Sibling subtrees are
//! expanded concurrently, up to [`Context::concurrency`](crate::Context)
//! listing calls at a time. A listing that keeps failing with a transient
//! error is retried per the [`RetryPolicy`](crate::RetryPolicy) and then
//! reported as an incomplete subtree; an authentication failure abandons the
//! user. Either way the walk moves on.
//!
//! With a shared root configured, the team space is walked the same way,
//! once, by the first user whose session can browse it. Its folders are
//! cached under [`SHARED_SPACE`](albumlink_cache::SHARED_SPACE).
//!
//! [`collect`] streams the discovered folders as [`CollectEvent`]s;
//! [`build_cache`] folds that stream into a [`FolderCache`](albumlink_cache::FolderCache)
//! and a [`Summary`](crate::Summary). Owners whose walk came up short can
//! have their gaps filled from a previous cache with
//! [`CollectReport::carry_forward`].

pub mod error;
mod stream;

pub(crate) use self::stream::logout;
pub use self::stream::{CollectEvent, CollectReport, build_cache, collect};
