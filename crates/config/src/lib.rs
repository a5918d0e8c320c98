//! Configuration for albumlink.
//!
//! Layers, later ones winning:
//! 1. Compiled-in defaults.
//! 2. The configuration file (TOML, YAML or JSON, picked by extension).
//! 3. Environment variables prefixed `ALBUMLINK_`, with `__` separating
//!    nested keys (`ALBUMLINK_NAS__HOST=nas.local`).
//!
//! The loaded [`Config`] is validated before it's handed out, and converted
//! into the types the rest of the workspace consumes ([`User`]s, a
//! [`Context`] and [`SynologyOptions`]).
//!
//! [`User`]: albumlink_library::User
//! [`Context`]: albumlink_library::Context
//! [`SynologyOptions`]: albumlink_photos::SynologyOptions

pub mod error;
mod models;
mod template;

pub use crate::models::{AlbumsConfig, Config, NasConfig, RetryConfig, UserConfig};
pub use crate::template::{TEMPLATE, dump_template};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};

/// Prefix of environment variables that override configuration keys.
pub const ENV_PREFIX: &str = "ALBUMLINK_";

/// Where the configuration lives when no path is given.
pub fn default_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "albumlink").ok_or_raise(|| ErrorKind::NoConfigDir)?;
    Ok(dirs.config_dir().join("config.toml"))
}

/// Load, merge and validate the configuration.
///
/// `path` defaults to [`default_path`]. The file must exist.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_path()?,
    };
    let config = Config::from_figment(figment(&path)?.merge(Env::prefixed(ENV_PREFIX).split("__")))?;
    tracing::debug!(path = %path.display(), users = config.users.len(), "Configuration loaded");
    Ok(config)
}

/// Defaults plus the configuration file at `path`.
fn figment(path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
    }
    let defaults = Figment::from(Serialized::defaults(Config::default()));
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => defaults.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => defaults.merge(Yaml::file_exact(path)),
        Some("json") => defaults.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

impl Config {
    /// Extract and validate a configuration from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
        [nas]
        host = "nas.local"

        [[users]]
        username = "alice"
        password = "secret"
        photo_root = "/Volumes/photo"
    "#;

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.py");
        fs::write(&path, "NAS_URL = 'x'").unwrap();
        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_toml_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, MINIMAL).unwrap();
        let config = Config::from_figment(figment(&path).unwrap()).unwrap();
        assert_eq!(config.nas.host, "nas.local");
        assert_eq!(config.nas.port, 5001);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.users[0].password.password(), "secret");
    }

    #[test]
    fn test_yaml_and_json() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("config.yml");
        fs::write(
            &yaml,
            "nas:\n  host: nas.local\n  port: 6001\nusers:\n  - username: bob\n    password: pw\n    photo_root: /Volumes/bob\n",
        )
        .unwrap();
        assert_eq!(Config::from_figment(figment(&yaml).unwrap()).unwrap().nas.port, 6001);

        let json = dir.path().join("config.json");
        fs::write(
            &json,
            r#"{"nas": {"host": "nas.local"}, "users": [{"username": "bob", "password": "pw", "photo_root": "/b"}], "concurrency": 3}"#,
        )
        .unwrap();
        assert_eq!(Config::from_figment(figment(&json).unwrap()).unwrap().concurrency, 3);
    }

    #[test]
    fn test_later_layers_win() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, MINIMAL).unwrap();
        let figment = figment(&path).unwrap().merge(Serialized::default("nas.port", 7000));
        let config = Config::from_figment(figment).unwrap();
        assert_eq!(config.nas.port, 7000);
        assert_eq!(config.nas.host, "nas.local");
    }

    #[test]
    fn test_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[nas]\nport = \"not a number\"\n").unwrap();
        let err = Config::from_figment(figment(&path).unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse));
    }
}
