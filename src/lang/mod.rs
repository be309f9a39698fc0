//! Language-specific scanners.
//!
//! Every supported language contributes to an upload the same three ways:
//! it prepares the package (collecting files or running an indexer), adds
//! its own artifacts to the archive, and annotates the build request
//! metadata. The set of languages is closed, so dispatch is a `match`.

pub mod c;
pub mod go;
pub mod python;

use crate::packer::archive::PathArchiver;
use crate::packer::package::Package;
use crate::utils::error::TerritoryError;
use crate::utils::progress::ProgressManager;
use clap::ValueEnum;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;

/// Language selector from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Language {
    #[default]
    #[value(name = "c", alias = "c++")]
    C,
    Go,
    Python,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Go => "go",
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings the scanners read from the merged configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Concurrent compiler probes; `None` picks a default from the core count
    pub jobs: Option<usize>,
    /// External Go scanner binary
    pub goscan_path: Option<PathBuf>,
    /// Interpreter used to run the Python scanner module
    pub python: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            jobs: None,
            goscan_path: None,
            python: python::DEFAULT_INTERPRETER.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum Lang {
    C(c::CLang),
    Go(go::GoLang),
    Python(python::PythonLang),
}

impl Lang {
    pub fn new(language: Language, config: &ScannerConfig) -> Self {
        match language {
            Language::C => Lang::C(c::CLang::new(config.jobs)),
            Language::Go => Lang::Go(go::GoLang::new(config.goscan_path.clone())),
            Language::Python => Lang::Python(python::PythonLang::new(config.python.clone())),
        }
    }

    pub fn language(&self) -> Language {
        match self {
            Lang::C(_) => Language::C,
            Lang::Go(_) => Language::Go,
            Lang::Python(_) => Language::Python,
        }
    }

    pub async fn prepare_package(
        &mut self,
        package: &mut Package,
        progress: &mut ProgressManager,
    ) -> Result<(), TerritoryError> {
        match self {
            Lang::C(lang) => lang.prepare_package(package, progress).await,
            Lang::Go(lang) => lang.prepare_package(package).await,
            Lang::Python(lang) => lang.prepare_package(package).await,
        }
    }

    pub fn add_to_archive<W: Write>(
        &self,
        package: &Package,
        archiver: &mut PathArchiver<W>,
    ) -> Result<(), TerritoryError> {
        match self {
            Lang::C(lang) => lang.add_to_archive(archiver),
            Lang::Go(_) | Lang::Python(_) => add_uim_output(package, archiver),
        }
    }

    pub fn add_to_meta(&self, meta: &mut Map<String, Value>) {
        if let Lang::C(lang) = self {
            lang.add_to_meta(meta);
        }
        meta.insert(
            "lang".to_string(),
            Value::String(self.language().as_str().to_string()),
        );
    }
}

/// Scanner output from `<temp>/uim` goes under `<repo>/.territory/uim`.
fn add_uim_output<W: Write>(
    package: &Package,
    archiver: &mut PathArchiver<W>,
) -> Result<(), TerritoryError> {
    let uim_dir = package.uim_temp_dir();
    if !uim_dir.is_dir() {
        tracing::warn!("scanner produced no output in {}", uim_dir.display());
        return Ok(());
    }
    archiver.add_dir_all_as(&uim_dir, &package.uim_archive_dir())
}

/// Run a scanner subprocess, failing on a non-zero exit.
pub(crate) async fn run_scanner(
    language: Language,
    program: &std::ffi::OsStr,
    args: &[std::ffi::OsString],
) -> Result<(), TerritoryError> {
    tracing::info!("running {} scanner: {:?} {:?}", language, program, args);
    let status = tokio::process::Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .status()
        .await
        .map_err(|e| TerritoryError::Scanner {
            lang: language.to_string(),
            message: format!("failed to start {}: {e}", program.to_string_lossy()),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(TerritoryError::Scanner {
            lang: language.to_string(),
            message: format!("{} exited with {status}", program.to_string_lossy()),
        })
    }
}

/// Arguments shared by the external scanners: `[--system] <scan dir> <output dir>`.
pub(crate) fn scanner_args(
    scan_dir: &std::path::Path,
    output_dir: &std::path::Path,
    system: bool,
) -> Vec<std::ffi::OsString> {
    let mut args = Vec::with_capacity(3);
    if system {
        args.push("--system".into());
    }
    args.push(scan_dir.as_os_str().to_os_string());
    args.push(output_dir.as_os_str().to_os_string());
    args
}
