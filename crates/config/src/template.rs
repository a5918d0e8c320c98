use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::OpenOptions;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::Path;

/// A commented starting point for a new configuration file.
pub const TEMPLATE: &str = r#"# albumlink configuration
#
# Any key can be overridden from the environment, e.g.
#   ALBUMLINK_NAS__HOST=nas.local
#   ALBUMLINK_OUTPUT=/srv/photos

# Folder cache written by `albumlink cache` and read by `albumlink link`.
cache_file = "folders_cache.json"
# Where the `albums/` and `users/` trees are created.
output = "."
# Remote calls in flight at once.
concurrency = 10
# Local mount of the shared space. Leave unset to skip shared folders.
# shared_root = "/Volumes/photo-shared"

[nas]
host = "nas.local"
port = 5001
secure = true
# Most units ship a self-signed certificate.
verify_tls = false
session = "SynologyPhotos"
timeout_secs = 30
page_size = 1000

[retry]
attempts = 3
initial_backoff_ms = 500
max_backoff_ms = 8000

[albums]
# "merge" shares albums/<year>/<name> between users; "split" appends " [<index>]".
merge = "merge"
# Take the year from a leading "2021 ..." or "21 ..." in the album name.
year_from_name = true

# One block per account. Order matters: a user's position names users/<index>
# and keys their folders in the cache.
[[users]]
username = "alice"
password = "change me"
# Local mount of this user's photo space.
photo_root = "/Volumes/photo"
"#;

/// Write [`TEMPLATE`] to `path`, never overwriting an existing file.
pub fn dump_template(path: &Path) -> Result<()> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
            exn::bail!(ErrorKind::AlreadyExists(path.to_path_buf()))
        },
        Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
    };
    file.write_all(TEMPLATE.as_bytes()).or_raise(|| ErrorKind::Io)?;
    tracing::info!(path = %path.display(), "Configuration template written");
    Ok(())
}
