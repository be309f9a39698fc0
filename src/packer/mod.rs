pub mod archive;
pub mod git;
pub mod package;

use crate::lang::Lang;
use crate::utils::error::TerritoryError;
use archive::{AddOutcome, PathArchiver};
use indicatif::ProgressBar;
use package::{FILE_LISTING_NAME, Package};
use std::path::Path;

/// Counts from one archiving pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Distinct entries written, including parent directories and links
    pub entries: usize,
    /// Captured paths that no longer exist
    pub missing: usize,
    /// Captured paths that could not be read
    pub failed: usize,
}

/// Write the upload archive for `package` to `archive_path`.
///
/// The file listing goes first, then whatever the language scanner adds,
/// then every captured file. Missing or unreadable captured files are logged
/// and skipped.
pub fn write_archive(
    package: &Package,
    lang: &Lang,
    listing: &Path,
    archive_path: &Path,
    progress: &ProgressBar,
) -> Result<ArchiveSummary, TerritoryError> {
    let mut archiver = PathArchiver::create(archive_path)?;
    archiver.add_file_as(listing, &package.repo_root.join(FILE_LISTING_NAME))?;
    lang.add_to_archive(package, &mut archiver)?;

    let mut summary = ArchiveSummary::default();
    for path in package.sorted_captured_files() {
        match archiver.add_path(path) {
            Ok(AddOutcome::Added) => {}
            Ok(AddOutcome::Missing) => summary.missing += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!("{e}");
            }
        }
        progress.inc(1);
    }

    summary.entries = archiver.len();
    archiver.finish()?;
    tracing::info!(
        "wrote {} entries to {} ({} missing, {} unreadable)",
        summary.entries,
        archive_path.display(),
        summary.missing,
        summary.failed
    );
    Ok(summary)
}
