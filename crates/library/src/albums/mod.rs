//! Album Enumerator.
//!
//! For every user: list the albums, then the items of each album (up to
//! [`Context::concurrency`](crate::Context) albums at a time), and resolve
//! each item's folder against the [`FolderCache`](albumlink_cache::FolderCache).
//! Items whose folder isn't cached are reported and dropped; the rest of the
//! album is unaffected.

pub mod error;
mod stream;
mod year;

pub use self::stream::{AlbumEvent, AlbumRecord, ResolvedItem, albums};
pub(crate) use self::stream::albums_inner;
pub use self::year::{AlbumYear, derive_year};
