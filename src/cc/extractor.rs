//! Per-translation-unit dependency extraction.
//!
//! The compiler is re-run in preprocess-only mode with `-MD -MF <file> -v`.
//! The dependency rule it writes gives the headers the unit reads; the verbose
//! output on stderr gives the resolved target triple and the system include
//! search list, which are pinned into the stored invocation.

use super::arguments::{
    DEPENDENCY_FLAGS, INCLUDE_PATH_FLAGS, PROBE_STRIPPED_FLAGS, remove_flags,
    splice_after_compiler,
};
use super::database::CompilationCommand;
use super::verbose::{VerboseProbeResult, parse_verbose_output};
use crate::utils::error::TerritoryError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Subdirectory of the scratch directory holding probe dependency files.
const DEPS_DIR: &str = "deps";

#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

/// Outcome of probing one compilation database entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCollectionResult {
    pub index: usize,
    pub paths: HashSet<PathBuf>,
    pub rewritten_arguments: Vec<String>,
}

/// Dependency file location for database entry `index`.
///
/// Named by a hash of the entry index and the absolute source path, so
/// concurrent probes sharing `tmp_dir` never collide, even for the same file
/// compiled twice or equal relative names in different directories.
pub fn dep_file_path(tmp_dir: &Path, index: usize, source: &Path) -> PathBuf {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&index.to_le_bytes());
    hasher.update(source.as_os_str().as_encoded_bytes());
    tmp_dir
        .join(DEPS_DIR)
        .join(format!("{}.d", hasher.finalize().to_hex()))
}

/// Build the preprocessing probe invocation from the stored arguments.
pub fn probe_arguments(arguments: &[String], dep_file: &Path) -> Vec<String> {
    let mut probe = remove_flags(arguments, PROBE_STRIPPED_FLAGS);
    splice_after_compiler(
        &mut probe,
        [
            "-E".to_string(),
            "-MD".to_string(),
            format!("-MF{}", dep_file.display()),
        ],
    );
    probe.extend(
        ["-v", "-o", NULL_DEVICE, "-Wno-error"]
            .iter()
            .map(|s| s.to_string()),
    );
    probe
}

/// Rewrite the stored invocation so it reproduces on another machine.
///
/// A resolved target is pinned with `-target`. A non-empty resolved search
/// list replaces every include-path flag with `-nostdinc` plus one `-I` per
/// directory, in search order.
pub fn rewrite_arguments(arguments: &[String], probe: &VerboseProbeResult) -> Vec<String> {
    let mut rewritten = arguments.to_vec();

    if let Some(target) = &probe.target {
        splice_after_compiler(&mut rewritten, ["-target", target.as_str()]);
    }

    if let Some(dirs) = probe
        .angle_bracket_include_paths
        .as_ref()
        .filter(|dirs| !dirs.is_empty())
    {
        rewritten = remove_flags(&rewritten, INCLUDE_PATH_FLAGS);
        rewritten = remove_flags(&rewritten, DEPENDENCY_FLAGS);

        let pinned = std::iter::once("-nostdinc".to_string())
            .chain(dirs.iter().map(|dir| format!("-I{dir}")));
        splice_after_compiler(&mut rewritten, pinned);
    }

    rewritten
}

/// Parse a makefile-style dependency rule into its prerequisite list.
///
/// Only the first rule is read. Continuation backslashes are stripped and the
/// remainder is shell-tokenized, which undoes the compiler's `\ ` escaping.
pub fn parse_dependency_rule(text: &str) -> Result<Vec<String>, String> {
    let (_target, prerequisites) = text
        .split_once(':')
        .ok_or_else(|| "dependency rule has no ':' separator".to_string())?;

    let joined = prerequisites
        .lines()
        .map(|line| line.trim_end_matches('\\'))
        .collect::<Vec<_>>()
        .join(" ");

    shlex::split(&joined).ok_or_else(|| "cannot tokenize dependency list".to_string())
}

/// Probe one translation unit and rewrite its arguments.
///
/// Probe failures degrade to an empty dependency set with whatever rewrite the
/// verbose output allowed. Only a compiler that cannot be started at all is
/// reported as an error.
pub fn query_details(
    index: usize,
    tmp_dir: &Path,
    command: &CompilationCommand,
) -> Result<DependencyCollectionResult, TerritoryError> {
    let dep_file = dep_file_path(tmp_dir, index, &command.source_path());
    if let Some(parent) = dep_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let probe = probe_arguments(&command.arguments, &dep_file);
    let (program, rest) = probe.split_first().ok_or_else(|| TerritoryError::Probe {
        file: command.file.clone(),
        message: "empty argument list".to_string(),
    })?;

    tracing::trace!("probe {}: {:?}", command.file.display(), probe);
    let output = Command::new(program)
        .args(rest)
        .current_dir(&command.directory)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| TerritoryError::Probe {
            file: command.file.clone(),
            message: format!("failed to run {program}: {e}"),
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let rewritten_arguments = rewrite_arguments(&command.arguments, &parse_verbose_output(&stderr));

    let paths = match std::fs::read_to_string(&dep_file) {
        Ok(text) => {
            if let Err(e) = std::fs::remove_file(&dep_file) {
                tracing::debug!("could not remove {}: {e}", dep_file.display());
            }
            match parse_dependency_rule(&text) {
                Ok(files) => files
                    .into_iter()
                    .map(|f| command.directory.join(f))
                    .collect(),
                Err(e) => {
                    tracing::warn!(
                        "failed to read dependencies of {}: {e}: {text:?}",
                        command.file.display()
                    );
                    HashSet::new()
                }
            }
        }
        Err(_) => {
            tracing::warn!("no dependencies recorded for {}", command.file.display());
            if !output.status.success() {
                tracing::warn!(
                    "compiler probe for {} exited with {}:\n{}",
                    command.file.display(),
                    output.status,
                    stderr.trim_end()
                );
            }
            HashSet::new()
        }
    };

    Ok(DependencyCollectionResult {
        index,
        paths,
        rewritten_arguments,
    })
}
