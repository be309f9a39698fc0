use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Name of the synthetic listing of tracked files, stored at the repo root.
pub const FILE_LISTING_NAME: &str = "TERRITORY_FILE_LISTING";

/// File name of the generated archive.
pub const ARCHIVE_NAME: &str = "territory_upload.tar.gz";

/// Where scanner output lives inside the archive, relative to the repo root.
pub const UIM_ARCHIVE_DIR: &str = ".territory/uim";

/// Scratch directory name for scanner output inside the temp dir.
pub const UIM_TEMP_DIR: &str = "uim";

/// Everything the language scanners need to contribute to one upload.
#[derive(Debug)]
pub struct Package {
    /// Directory the client was run from
    pub work_dir: PathBuf,
    /// Scratch directory, removed after the upload
    pub temp_dir: PathBuf,
    /// Outermost git working tree containing `work_dir`
    pub repo_root: PathBuf,
    /// Absolute paths to put in the archive
    pub captured_files: HashSet<PathBuf>,
    /// Keep files outside `repo_root` (system headers)
    pub index_system: bool,
    pub upload_token: Option<String>,
}

impl Package {
    pub fn new(work_dir: PathBuf, temp_dir: PathBuf, repo_root: PathBuf, index_system: bool) -> Self {
        Self {
            work_dir,
            temp_dir,
            repo_root,
            captured_files: HashSet::new(),
            index_system,
            upload_token: None,
        }
    }

    /// Capture each listed file, taken relative to `work_dir`.
    pub fn capture_listing<'a, I>(&mut self, listing: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let work_dir = &self.work_dir;
        self.captured_files.extend(
            listing
                .into_iter()
                .filter(|line| !line.is_empty())
                .map(|line| work_dir.join(line)),
        );
    }

    /// Drop captured files outside the repository unless system files were
    /// requested.
    pub fn retain_repository_files(&mut self) {
        if self.index_system {
            return;
        }
        let root = &self.repo_root;
        let before = self.captured_files.len();
        self.captured_files.retain(|path| {
            let normalized = lexically_normalize(path);
            normalized.starts_with(root) && &normalized != root
        });
        tracing::debug!(
            "kept {} of {} captured files under {}",
            self.captured_files.len(),
            before,
            root.display()
        );
    }

    /// Captured files in a stable order, so archives are reproducible.
    pub fn sorted_captured_files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = self.captured_files.iter().map(PathBuf::as_path).collect();
        files.sort();
        files
    }

    pub fn uim_temp_dir(&self) -> PathBuf {
        self.temp_dir.join(UIM_TEMP_DIR)
    }

    pub fn uim_archive_dir(&self) -> PathBuf {
        self.repo_root.join(UIM_ARCHIVE_DIR)
    }
}

/// Collapse `.` and `..` without touching the filesystem.
fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
