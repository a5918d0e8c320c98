//! Storage models.

use std::path::PathBuf;

/// What currently occupies a path in the output tree.
///
/// Inspection never follows symbolic links: a link pointing at a missing
/// target (an unmounted NAS share, for instance) is still reported as
/// [`Entry::Link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A symbolic link and its raw, unresolved target.
    Link(PathBuf),
    Directory,
    /// Anything else: regular files, sockets, fifos...
    File,
}
impl Entry {
    pub fn is_link_to(&self, target: impl AsRef<std::path::Path>) -> bool {
        matches!(self, Self::Link(existing) if existing == target.as_ref())
    }
}
