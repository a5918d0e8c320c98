//! albumlink - rebuild Synology Photos albums as symbolic links.
//!
//! `albumlink cache` walks every user's folder tree and saves it, `albumlink
//! link` turns the albums into `albums/<year>/<name>/<file>` links against
//! that cache.

mod cli;
mod error;

use crate::cli::{Cli, Command, ConfigArgs};
use crate::error::{ErrorKind, Result};
use albumlink_cache::error::ErrorKind as CacheErrorKind;
use albumlink_cache::{CacheStore, FolderCache};
use albumlink_config::Config;
use albumlink_library::{RunStatus, Summary, build_cache, create_links};
use albumlink_photos::SynologyPhotos;
use albumlink_storage::BackendHandle;
use albumlink_storage::backend::{LocalBackend, ReadOnlyBackend};
use clap::Parser;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// At least one user had to be skipped.
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.log_level());
    match run(cli.command).await {
        Ok(RunStatus::Success) => ExitCode::SUCCESS,
        Ok(RunStatus::Partial) => ExitCode::from(EXIT_PARTIAL),
        Err(e) => {
            tracing::error!(error = %*e, "Run failed");
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(command: Command) -> Result<RunStatus> {
    match command {
        Command::Cache(args) => cache(&args).await,
        Command::Link { config, output, dry_run } => link(&config, output, dry_run).await,
        Command::DumpConfig { path } => {
            albumlink_config::dump_template(&path).or_raise(|| ErrorKind::Config)?;
            println!("Configuration template written to {}", path.display());
            Ok(RunStatus::Success)
        },
    }
}

fn load_config(args: &ConfigArgs) -> Result<(Config, SynologyPhotos)> {
    let config = albumlink_config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let service = SynologyPhotos::new(config.synology_options()).or_raise(|| ErrorKind::Client)?;
    Ok((config, service))
}

async fn cache(args: &ConfigArgs) -> Result<RunStatus> {
    let (config, service) = load_config(args)?;
    let users = config.users();
    let mut report = build_cache(&service, &users, &config.context()).await;
    // Keep whatever cache is already on disk rather than replace it with nothing.
    if report.summary.users_processed == 0 {
        println!("{}", report.summary);
        exn::bail!(ErrorKind::NoUsers);
    }

    let store = CacheStore::new(&config.cache_file);
    if !report.partial.is_empty()
        && let Some(previous) = previous_cache(&store)
    {
        report.carry_forward(&previous);
    }
    println!("{}", report.summary);
    store.save(&report.cache).or_raise(|| ErrorKind::SaveCache)?;
    tracing::info!(path = %store.path().display(), folders = report.cache.len(), "Folder cache written");
    Ok(report.summary.status())
}

/// The cache a previous run left behind, if it can still be read.
fn previous_cache(store: &CacheStore) -> Option<FolderCache> {
    match store.load() {
        Ok(cache) => Some(cache),
        Err(e) if matches!(&*e, CacheErrorKind::Missing(_)) => None,
        Err(e) => {
            tracing::warn!(
                path = %store.path().display(),
                error = %*e,
                "Previous cache unreadable; nothing to carry over"
            );
            None
        },
    }
}

async fn link(args: &ConfigArgs, output: Option<PathBuf>, dry_run: bool) -> Result<RunStatus> {
    let (config, service) = load_config(args)?;
    let cache = CacheStore::new(&config.cache_file).load().or_raise(|| ErrorKind::NeedCache)?;

    let root = absolute(output.as_deref().unwrap_or(&config.output))?;
    let local: BackendHandle = Arc::new(LocalBackend::new("output", &root).or_raise(|| ErrorKind::Output)?);
    let backend: BackendHandle = if dry_run { Arc::new(ReadOnlyBackend::new(local)) } else { local };
    tracing::info!(root = %root.display(), dry_run, "Output tree");

    let users = config.users();
    let report = create_links(&service, &users, &cache, &backend, &config.context()).await;
    println!("{}", report.summary);
    finish(&report.summary)
}

fn finish(summary: &Summary) -> Result<RunStatus> {
    if summary.users_processed == 0 {
        exn::bail!(ErrorKind::NoUsers);
    }
    Ok(summary.status())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir().or_raise(|| ErrorKind::Output)?.join(path))
    }
}
