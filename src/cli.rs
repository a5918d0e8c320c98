use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Re-materialize Synology Photos albums as a tree of symbolic links.
#[derive(Debug, Parser)]
#[command(name = "albumlink", version, about)]
pub struct Cli {
    /// More output; repeat for more (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Walk every user's folder tree and write the folder cache.
    Cache(ConfigArgs),
    /// Build the album link tree from the folder cache.
    Link {
        #[command(flatten)]
        config: ConfigArgs,
        /// Output root, overriding `output` from the configuration.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Inspect the output tree and report what would change without
        /// writing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Write a commented configuration template.
    DumpConfig {
        /// Destination; an existing file is never overwritten.
        path: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Configuration file (TOML, YAML or JSON). Defaults to the platform
    /// configuration directory.
    #[arg(short, long, env = "ALBUMLINK_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Default log directive for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        }
    }
}
