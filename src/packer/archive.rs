//! Symlink-preserving, at-most-once archive writer.
//!
//! Paths are walked component by component. `..` segments are collapsed
//! lexically, and a symlinked component is recorded as a link entry and then
//! replaced by its literal target so the walk continues through the real
//! location. Every prefix that is reached is written once, as a single
//! non-recursive entry, so extracting the archive reproduces the original
//! directory and symlink graph.

use crate::utils::error::TerritoryError;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Upper bound on link expansions for a single input path.
const MAX_SYMLINK_EXPANSIONS: usize = 40;

/// Whether [`PathArchiver::add_path`] wrote the path or skipped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Missing,
}

pub struct PathArchiver<W: Write> {
    builder: tar::Builder<W>,
    added: HashSet<PathBuf>,
}

impl PathArchiver<GzEncoder<File>> {
    /// Create a gzip-compressed archive at `path`.
    pub fn create(path: &Path) -> Result<Self, TerritoryError> {
        let file = File::create(path)?;
        Ok(Self::new(GzEncoder::new(file, Compression::default())))
    }

    /// Write the tar trailer and flush the gzip stream.
    pub fn finish(self) -> Result<File, TerritoryError> {
        let encoder = self.into_inner()?;
        Ok(encoder.finish()?)
    }
}

impl<W: Write> PathArchiver<W> {
    pub fn new(writer: W) -> Self {
        let mut builder = tar::Builder::new(writer);
        builder.follow_symlinks(false);
        Self {
            builder,
            added: HashSet::new(),
        }
    }

    /// Number of entries written so far.
    pub fn len(&self) -> usize {
        self.added.len()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }

    /// Whether `path` (in resolved form) has already been written.
    pub fn contains(&self, path: &Path) -> bool {
        self.added.contains(path)
    }

    /// Add `path` and everything needed to reach it.
    ///
    /// Each resolved prefix is written at most once across the whole archive,
    /// however many different spellings lead to it. Returns
    /// [`AddOutcome::Missing`] if some component does not exist.
    pub fn add_path(&mut self, path: &Path) -> Result<AddOutcome, TerritoryError> {
        let mut stack: Vec<OsString> = path
            .components()
            .map(|c| c.as_os_str().to_os_string())
            .collect();
        let mut expansions = 0usize;
        let mut i = 1usize;

        while i <= stack.len() {
            let current = stack[i - 1].as_os_str();

            if current == OsStr::new("..") {
                let start = if i >= 2 && !is_root(&stack[i - 2]) {
                    i - 2
                } else {
                    i - 1
                };
                stack.drain(start..i);
                i = start + 1;
                continue;
            }
            if current == OsStr::new(".") {
                stack.remove(i - 1);
                continue;
            }

            let prefix: PathBuf = stack[..i].iter().collect();
            let metadata = match std::fs::symlink_metadata(&prefix) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!("missing file: {}", path.display());
                    return Ok(AddOutcome::Missing);
                }
                Err(e) => return Err(archive_error(&prefix, e)),
            };

            if metadata.file_type().is_symlink() {
                expansions += 1;
                if expansions > MAX_SYMLINK_EXPANSIONS {
                    return Err(TerritoryError::Archive {
                        path: path.to_path_buf(),
                        message: "too many levels of symbolic links".to_string(),
                    });
                }

                self.append_once(&prefix)?;
                let target = std::fs::read_link(&prefix).map_err(|e| archive_error(&prefix, e))?;
                let target_parts = target.components().map(|c| c.as_os_str().to_os_string());

                if target.is_absolute() {
                    stack.splice(..i, target_parts);
                    i = 1;
                } else {
                    stack.splice(i - 1..i, target_parts);
                }
                continue;
            }

            self.append_once(&prefix)?;
            i += 1;
        }

        Ok(AddOutcome::Added)
    }

    /// Add a file from `src` under the absolute archive location `arcname`.
    ///
    /// `arcname` is marked as present, so a later [`add_path`](Self::add_path)
    /// reaching the same location does not write it again.
    pub fn add_file_as(&mut self, src: &Path, arcname: &Path) -> Result<(), TerritoryError> {
        if !self.added.insert(arcname.to_path_buf()) {
            return Ok(());
        }
        self.builder
            .append_path_with_name(src, entry_name(arcname))
            .map_err(|e| archive_error(src, e))
    }

    /// Recursively add the contents of `src_dir` under `arc_dir`.
    pub fn add_dir_all_as(&mut self, src_dir: &Path, arc_dir: &Path) -> Result<(), TerritoryError> {
        self.added.insert(arc_dir.to_path_buf());
        self.builder
            .append_dir_all(entry_name(arc_dir), src_dir)
            .map_err(|e| archive_error(src_dir, e))
    }

    /// Finish the tar stream and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W, TerritoryError> {
        Ok(self.builder.into_inner()?)
    }

    fn append_once(&mut self, prefix: &Path) -> Result<(), TerritoryError> {
        let name = entry_name(prefix);
        if name.as_os_str().is_empty() || self.added.contains(prefix) {
            return Ok(());
        }
        self.builder
            .append_path_with_name(prefix, &name)
            .map_err(|e| archive_error(prefix, e))?;
        self.added.insert(prefix.to_path_buf());
        Ok(())
    }
}

fn is_root(component: &OsStr) -> bool {
    matches!(
        Path::new(component).components().next(),
        Some(Component::RootDir | Component::Prefix(_))
    )
}

/// Archive member name for an absolute path: the path without its root.
fn entry_name(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

fn archive_error(path: &Path, err: std::io::Error) -> TerritoryError {
    TerritoryError::Archive {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
