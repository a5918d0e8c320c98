use crate::error::{ErrorKind, Result};
use albumlink_library::{Context, DEFAULT_CONCURRENCY, MergePolicy, RetryPolicy, User};
use albumlink_photos::{Credentials, SynologyOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub nas: NasConfig,
    /// Accounts to migrate, in order. A user's position is their index in
    /// the cache and under `users/`, so reordering invalidates both.
    pub users: Vec<UserConfig>,
    /// The folder cache written by `cache` and read by `link`.
    pub cache_file: PathBuf,
    /// Root of the generated `albums/` and `users/` trees.
    pub output: PathBuf,
    /// Local mount of the shared space. Unset leaves shared folders out of
    /// the cache and their items unlinked.
    pub shared_root: Option<PathBuf>,
    pub concurrency: usize,
    pub retry: RetryConfig,
    pub albums: AlbumsConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            nas: NasConfig::default(),
            users: Vec::new(),
            cache_file: PathBuf::from("folders_cache.json"),
            output: PathBuf::from("."),
            shared_root: None,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryConfig::default(),
            albums: AlbumsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NasConfig {
    pub host: String,
    pub port: u16,
    /// Talk HTTPS rather than plain HTTP.
    pub secure: bool,
    /// Most NAS units present a self-signed certificate.
    pub verify_tls: bool,
    pub session: String,
    pub timeout_secs: u64,
    pub page_size: u32,
}
impl Default for NasConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 5001,
            secure: true,
            verify_tls: false,
            session: "SynologyPhotos".to_string(),
            timeout_secs: 30,
            page_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub password: Credentials,
    /// Local mount point of this user's photo space. Link targets are built
    /// from it, so it must be absolute.
    pub photo_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}
impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlbumsConfig {
    pub merge: MergePolicy,
    pub year_from_name: bool,
}
impl Default for AlbumsConfig {
    fn default() -> Self {
        Self { merge: MergePolicy::default(), year_from_name: true }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.nas.host.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("nas.host must be set".to_string()));
        }
        if self.nas.port == 0 {
            exn::bail!(ErrorKind::Invalid("nas.port must not be 0".to_string()));
        }
        if self.nas.page_size == 0 {
            exn::bail!(ErrorKind::Invalid("nas.page_size must be at least 1".to_string()));
        }
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.retry.attempts == 0 {
            exn::bail!(ErrorKind::Invalid("retry.attempts must be at least 1".to_string()));
        }
        if self.users.is_empty() {
            exn::bail!(ErrorKind::Invalid("at least one user must be configured".to_string()));
        }
        let mut seen = HashSet::new();
        for (index, user) in self.users.iter().enumerate() {
            if user.username.trim().is_empty() {
                exn::bail!(ErrorKind::Invalid(format!("users[{index}].username must be set")));
            }
            if !seen.insert(user.username.as_str()) {
                exn::bail!(ErrorKind::Invalid(format!("user {:?} is configured more than once", user.username)));
            }
            if !user.photo_root.is_absolute() {
                exn::bail!(ErrorKind::Invalid(format!(
                    "users[{index}].photo_root must be absolute: {}",
                    user.photo_root.display()
                )));
            }
        }
        if let Some(shared) = &self.shared_root
            && !shared.is_absolute()
        {
            exn::bail!(ErrorKind::Invalid(format!("shared_root must be absolute: {}", shared.display())));
        }
        Ok(())
    }

    /// Configured accounts, indexed by position.
    pub fn users(&self) -> Vec<User> {
        self.users
            .iter()
            .zip(0u32..)
            .map(|(user, index)| User {
                index,
                username: user.username.clone(),
                credentials: user.password.clone(),
                photo_root: user.photo_root.clone(),
            })
            .collect()
    }

    pub fn context(&self) -> Context {
        Context {
            concurrency: self.concurrency,
            retry: RetryPolicy {
                attempts: self.retry.attempts,
                initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
            },
            merge: self.albums.merge,
            year_from_name: self.albums.year_from_name,
            shared_root: self.shared_root.clone(),
        }
    }

    pub fn synology_options(&self) -> SynologyOptions {
        SynologyOptions {
            verify_tls: self.nas.verify_tls,
            session_name: self.nas.session.clone(),
            timeout: Duration::from_secs(self.nas.timeout_secs),
            page_size: self.nas.page_size,
            ..SynologyOptions::new(&self.nas.host, self.nas.port, self.nas.secure)
        }
    }
}
