//! Configuration management using the `config` crate for hierarchical discovery and merging.
//!
//! ## Configuration Sources (in precedence order, highest to lowest):
//! 1. **CLI flags**
//! 2. **Environment variables** (`TERRITORY_UPLOAD_API`, `TERRITORY_AUTHORIZER`,
//!    `TERRITORY_JOBS`, ..., plus `GOSCAN_PATH` and `CORES`)
//! 3. **Config files**
//!
//! ## Config File Discovery (in merge order, later overrides earlier):
//! 1. `~/.config/territory/config.toml`
//! 2. `territory.toml` in the git repository root
//! 3. `territory.toml` in the working directory
//! 4. Explicit `--config` path

use crate::MergedConfig;
use crate::cli::args::Args;
use crate::lang::ScannerConfig;
use crate::lang::go::GOSCAN_PATH_ENV;
use crate::lang::python::DEFAULT_INTERPRETER;
use crate::packer::git::find_repo_root;
use crate::upload::auth::{DEFAULT_AUTHORIZER, default_token_path};
use crate::upload::client::DEFAULT_UPLOAD_API;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "territory.toml";

/// Settings loaded from config files and `TERRITORY_*` variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the upload API
    pub upload_api: Option<String>,
    /// Page that issues upload tokens
    pub authorizer: Option<String>,
    /// Concurrent compiler probes
    pub jobs: Option<usize>,
    pub goscan_path: Option<PathBuf>,
    pub python: Option<String>,
    pub upload_token_path: Option<PathBuf>,
}

fn discover_config_paths(work_dir: &Path, explicit_path: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(user_config) = get_user_config_path() {
        paths.push(user_config);
    }

    if let Ok(repo_root) = find_repo_root(work_dir) {
        let repo_config = repo_root.join(CONFIG_FILE_NAME);
        if repo_config.exists() {
            paths.push(repo_config);
        }
    }

    let local_config = work_dir.join(CONFIG_FILE_NAME);
    if local_config.exists() && !paths.contains(&local_config) {
        paths.push(local_config);
    }

    if explicit_path != Path::new(CONFIG_FILE_NAME) && explicit_path.exists() {
        paths.push(explicit_path.to_path_buf());
    }

    paths
}

fn get_user_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|config_dir| config_dir.join("territory").join("config.toml"))
        .filter(|path| path.exists())
}

/// Resolve the directory to work in: `-C` if given, else the current one.
pub fn resolve_work_dir(args: &Args) -> Result<PathBuf> {
    let dir = match &args.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("Cannot access directory {}", dir.display()))
}

/// Load configuration from discovered config files and environment variables.
pub fn load(args: &Args, work_dir: &Path) -> Result<Config> {
    let mut builder = config::Config::builder();

    for config_path in discover_config_paths(work_dir, &args.config) {
        tracing::debug!("loading config from {}", config_path.display());
        builder = builder.add_source(config::File::from(config_path));
    }

    builder = builder.add_source(config::Environment::with_prefix("TERRITORY").try_parsing(true));

    let settings = builder.build().context("Failed to build configuration")?;

    settings
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Combine CLI flags with loaded configuration; flags win.
pub fn merge_config(args: &Args, config: Config, work_dir: PathBuf) -> MergedConfig {
    let upload = args.upload_args();

    let goscan_path = std::env::var_os(GOSCAN_PATH_ENV)
        .map(PathBuf::from)
        .or(config.goscan_path);

    MergedConfig {
        work_dir,
        verbose: args.verbose,
        debug: args.debug,
        language: upload.lang,
        upload_token_path: upload
            .upload_token_path
            .clone()
            .or(config.upload_token_path)
            .unwrap_or_else(default_token_path),
        index_system: upload.system,
        repo_id: upload.repo_id.clone(),
        tarball_only: upload.tarball_only,
        upload_api: config
            .upload_api
            .unwrap_or_else(|| DEFAULT_UPLOAD_API.to_string()),
        authorizer: config
            .authorizer
            .unwrap_or_else(|| DEFAULT_AUTHORIZER.to_string()),
        scanner: ScannerConfig {
            jobs: upload.jobs.or(config.jobs).filter(|&jobs| jobs > 0),
            goscan_path,
            python: config
                .python
                .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
        },
    }
}
