//! Link Tree Builder.
//!
//! Lays out the output tree:
//!
//! ```text
//! users/<index>                    -> <photo root>
//! albums/<year>/<album>/<filename> -> <photo root>/<folder path>/<filename>
//! ```
//!
//! Work is split in two. [`plan`] is pure: it decides every directory, link
//! name and target up front (including the per-directory filename
//! disambiguation), so the layout only depends on the inputs and re-runs are
//! stable. [`link`] then applies a [`LinkPlan`] through a
//! [`StorageBackend`](albumlink_storage::StorageBackend), where each
//! directory is owned by exactly one task and
//! [`ensure_link`] keeps correct links untouched.

mod action;
pub mod error;
mod plan;
mod stream;

pub use self::action::{Action, ensure_link};
pub use self::plan::{DirectoryPlan, LinkPlan, PlannedLink, UserLink, plan, sanitize};
pub use self::stream::{LinkEvent, LinkReport, create_links, link};
