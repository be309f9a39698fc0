use crate::lang::Language;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// CLI argument parsing with environment variable support.
///
/// Settings that also live in config files (`TERRITORY_*` variables,
/// `territory.toml`) are resolved in [`crate::cli::config`]; flags given here
/// always win.
#[derive(Parser, Debug)]
#[command(name = "territory")]
#[command(about = "Package a repository and its build dependencies for territory.dev")]
#[command(version)]
pub struct Args {
    /// Execute in a directory
    #[arg(short = 'C', value_name = "PARSEDIR")]
    pub directory: Option<PathBuf>,

    /// Enable debug logging, including HTTP traffic
    #[arg(short = 'L')]
    pub debug: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, default_value = "territory.toml", env = "TERRITORY_CONFIG", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect, archive and upload the repository
    Upload(UploadArgs),
}

#[derive(clap::Args, Debug)]
#[command(group(
    ArgGroup::new("destination")
        .required(true)
        .args(["repo_id", "tarball_only"])
))]
pub struct UploadArgs {
    /// Language to parse
    #[arg(short = 'l', long = "lang", value_enum, default_value_t = Language::C)]
    pub lang: Language,

    /// Where the upload token is stored
    #[arg(long)]
    pub upload_token_path: Option<PathBuf>,

    /// Collect system-wide dependencies
    #[arg(long)]
    pub system: bool,

    /// Concurrent compiler probes
    #[arg(short = 'j', long, env = "CORES")]
    pub jobs: Option<usize>,

    /// Repository to upload to
    #[arg(long)]
    pub repo_id: Option<String>,

    /// Do not upload, create territory_upload.tar.gz in the repository root only
    #[arg(long)]
    pub tarball_only: bool,
}

impl Args {
    pub fn upload_args(&self) -> &UploadArgs {
        match &self.command {
            Command::Upload(upload) => upload,
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
