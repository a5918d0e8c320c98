use std::fmt;

/// Overall outcome of a run, as far as the exit status is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every user was processed. Per-item warnings and conflicts may still
    /// have been reported.
    Success,
    /// At least one user had to be skipped entirely.
    Partial,
}

/// Counters accumulated over a run and printed when it finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub users_processed: usize,
    pub users_failed: usize,
    pub folders: usize,
    /// Folders whose children couldn't be listed after all retries.
    pub incomplete_folders: usize,
    /// Folders kept from the previous cache because their owner's walk didn't
    /// finish this time.
    pub folders_carried: usize,
    pub albums: usize,
    /// Albums whose items couldn't be listed after all retries.
    pub incomplete_albums: usize,
    pub links_created: usize,
    pub links_unchanged: usize,
    pub links_replaced: usize,
    /// Items already linked from the same directory by another album.
    pub duplicates: usize,
    pub warnings: usize,
    pub conflicts: usize,
    /// Links that couldn't be written for reasons other than a conflict.
    pub failures: usize,
}
impl Summary {
    pub fn status(&self) -> RunStatus {
        match self.users_failed {
            0 => RunStatus::Success,
            _ => RunStatus::Partial,
        }
    }

    /// Number of filesystem writes a run performed (directories excluded).
    pub fn writes(&self) -> usize {
        self.links_created + self.links_replaced
    }
}
impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "users:    {} processed, {} failed", self.users_processed, self.users_failed)?;
        if self.folders > 0 || self.incomplete_folders > 0 || self.folders_carried > 0 {
            write!(f, "folders:  {} cached, {} incomplete", self.folders, self.incomplete_folders)?;
            if self.folders_carried > 0 {
                write!(f, ", {} carried over", self.folders_carried)?;
            }
            writeln!(f)?;
        }
        if self.albums > 0 || self.incomplete_albums > 0 {
            writeln!(f, "albums:   {} processed, {} incomplete", self.albums, self.incomplete_albums)?;
            writeln!(
                f,
                "links:    {} created, {} unchanged, {} replaced, {} duplicates",
                self.links_created, self.links_unchanged, self.links_replaced, self.duplicates
            )?;
        }
        write!(f, "problems: {} warnings, {} conflicts, {} failures", self.warnings, self.conflicts, self.failures)
    }
}
