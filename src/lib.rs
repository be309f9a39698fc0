//! # territory
//!
//! Packages a native-code repository for remote indexing. The upload
//! pipeline runs these stages:
//!
//! 1. **Init** - Token lookup and repository discovery
//! 2. **Collecting** - Language scanner preparation; for C and C++ this probes
//!    every compilation database entry to find the headers it reads and to
//!    pin its target and include search path
//! 3. **Archiving** - Writing the listing, scanner output and every captured
//!    file into a symlink-preserving `.tar.gz`
//! 4. **Registering** - Creating a build request with commit metadata
//! 5. **Uploading** - Sending the archive to the returned location
//! 6. **Complete**
//!
//! With `--tarball-only` the pipeline stops after archiving and leaves
//! `territory_upload.tar.gz` in the repository root.
//!
//! Configuration follows hierarchical precedence:
//! 1. User config (~/.config/territory/config.toml)
//! 2. Git root (territory.toml)
//! 3. Working directory (territory.toml)
//! 4. Explicit --config path
//! 5. Environment variables (TERRITORY_*)
//! 6. CLI flags (highest precedence)

pub mod cc;
pub mod cli;
pub mod lang;
pub mod packer;
pub mod upload;
pub mod utils;

use anyhow::{Context, Result};
use lang::{Lang, Language, ScannerConfig};
use packer::git;
use packer::package::{ARCHIVE_NAME, FILE_LISTING_NAME, Package};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use upload::UploadClient;
use utils::progress::{ProgressManager, stages};

/// Final resolved configuration after merging CLI flags, environment and
/// config files. Passed by reference into every pipeline stage.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    /// Canonical directory the client runs in
    pub work_dir: PathBuf,
    /// Verbosity level (0-2)
    pub verbose: u8,
    /// Debug logging for every crate, HTTP client included
    pub debug: bool,
    pub language: Language,
    pub upload_token_path: PathBuf,
    /// Keep dependencies outside the repository
    pub index_system: bool,
    pub repo_id: Option<String>,
    /// Stop after writing the archive
    pub tarball_only: bool,
    pub upload_api: String,
    pub authorizer: String,
    pub scanner: ScannerConfig,
}

/// Tracks the current stage of pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    Collecting,
    Archiving,
    Registering,
    Uploading,
    Complete,
}

/// State carried through the pipeline stages.
#[derive(Debug)]
pub struct PipelineContext {
    pub config: MergedConfig,
    pub stage: PipelineStage,
}

impl PipelineContext {
    pub fn new(config: MergedConfig) -> Self {
        Self {
            config,
            stage: PipelineStage::Init,
        }
    }

    pub fn set_stage(&mut self, stage: PipelineStage) {
        self.stage = stage;
        tracing::debug!("Pipeline stage: {:?}", stage);
    }
}

pub fn version_string() -> String {
    format!("territory CLI {}", env!("CARGO_PKG_VERSION"))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the flags.
pub fn init_logging(verbose: u8, debug: bool) {
    let directive = if debug {
        "debug".to_string()
    } else {
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        format!("warn,territory={level}")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the upload pipeline.
pub async fn run(config: MergedConfig) -> Result<()> {
    println!("{}", version_string());
    tracing::debug!(
        "Configuration: language={}, work_dir={}, system={}, tarball_only={}, jobs={:?}",
        config.language,
        config.work_dir.display(),
        config.index_system,
        config.tarball_only,
        config.scanner.jobs
    );

    let mut ctx = PipelineContext::new(config);

    // Stage 1: Init
    ctx.set_stage(PipelineStage::Init);
    let upload_token = if ctx.config.tarball_only {
        None
    } else {
        Some(upload::auth::load_or_acquire_token(
            &ctx.config.upload_token_path,
            &ctx.config.authorizer,
        )?)
    };

    let work_dir = ctx.config.work_dir.clone();
    let repo_root = git::find_repo_root(&work_dir)?;
    println!("repository root directory: {}", repo_root.display());

    let temp_dir = tempfile::Builder::new()
        .prefix("territory-")
        .tempdir()
        .context("Failed to create temporary directory")?;

    let mut package = Package::new(
        work_dir.clone(),
        temp_dir.path().to_path_buf(),
        repo_root.clone(),
        ctx.config.index_system,
    );
    package.upload_token = upload_token;

    let listing = git::list_repo_files(&work_dir)?.join("\n");
    let listing_path = temp_dir.path().join(FILE_LISTING_NAME);
    std::fs::write(&listing_path, &listing)
        .with_context(|| format!("Failed to write {}", listing_path.display()))?;
    package.capture_listing(listing.split('\n'));

    // Stage 2: Collecting
    ctx.set_stage(PipelineStage::Collecting);
    let mut progress = ProgressManager::new();
    let mut lang = Lang::new(ctx.config.language, &ctx.config.scanner);
    lang.prepare_package(&mut package, &mut progress).await?;
    package.retain_repository_files();

    // Stage 3: Archiving
    ctx.set_stage(PipelineStage::Archiving);
    let archive_dir = if ctx.config.tarball_only {
        repo_root.clone()
    } else {
        temp_dir.path().to_path_buf()
    };
    let archive_path = archive_dir.join(ARCHIVE_NAME);
    let bar = progress.add_stage(stages::COMPRESSING, package.captured_files.len() as u64);
    let summary = packer::write_archive(&package, &lang, &listing_path, &archive_path, &bar)
        .context("Failed to write archive")?;
    progress.finish(
        stages::COMPRESSING,
        &format!("archived {} entries", summary.entries),
    );

    if ctx.config.tarball_only {
        println!("created {}", archive_path.display());
        ctx.set_stage(PipelineStage::Complete);
        return Ok(());
    }

    // Stage 4: Registering
    ctx.set_stage(PipelineStage::Registering);
    let repo_id = ctx
        .config
        .repo_id
        .clone()
        .context("A repository id is required to upload")?;
    let token = package
        .upload_token
        .clone()
        .context("An upload token is required to upload")?;

    println!("collecting commit info");
    let branch = git::get_branch(&repo_root)?;
    let mut meta = Map::new();
    meta.insert("commit".to_string(), Value::String(git::get_sha(&repo_root)?));
    meta.insert(
        "commit_message".to_string(),
        Value::String(git::get_commit_message(&repo_root)?),
    );
    meta.insert(
        "repo_root".to_string(),
        Value::String(repo_root.display().to_string()),
    );
    meta.insert(
        "index_system".to_string(),
        Value::Bool(ctx.config.index_system),
    );
    lang.add_to_meta(&mut meta);

    println!("registering build request");
    let blob_size = std::fs::metadata(&archive_path)
        .with_context(|| format!("Failed to stat {}", archive_path.display()))?
        .len();
    let client = UploadClient::new(ctx.config.upload_api.clone(), token);
    let intent = client
        .create_build_request(&repo_id, &branch, &meta, blob_size)
        .await?;

    // Stage 5: Uploading
    ctx.set_stage(PipelineStage::Uploading);
    println!("uploading");
    let spinner = progress.add_stage(stages::UPLOADING, 0);
    spinner.set_message(format!("{blob_size} bytes"));
    if let Err(e) = client.upload_archive(&intent, &archive_path).await {
        progress.abandon(stages::UPLOADING);
        return Err(e.into());
    }
    progress.finish(stages::UPLOADING, "upload complete");

    ctx.set_stage(PipelineStage::Complete);
    println!(
        "Indexing will begin shortly. You can track build status at <https://app.territory.dev/repos/{repo_id}/jobs>."
    );
    Ok(())
}
