//! Common test utilities and fixtures for integration tests.

#![allow(dead_code)]

use git2::Repository;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Path of the compiled `territory` binary.
pub fn territory_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_territory"))
}

/// Creates a temporary directory for test fixtures.
///
/// The path is canonicalized so expectations match what the client sees
/// after resolving its working directory.
pub fn create_temp_dir() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let root = dir
        .path()
        .canonicalize()
        .expect("Failed to canonicalize temp directory");
    (dir, root)
}

/// Creates a mock project structure for testing.
pub fn create_mock_project(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let file_path = root.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }
}

/// Two translation units sharing one header, plus a Makefile that is only
/// reachable through the file listing.
pub fn c_project_files() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "mod1.c",
            "#include \"shared.h\"\n\nint mod1(void) { return SHARED; }\n",
        ),
        (
            "dir/mod2.c",
            "#include \"shared.h\"\n\nint mod2(void) { return SHARED + 1; }\n",
        ),
        ("shared.h", "#define SHARED 42\n"),
        ("Makefile", "all:\n\tcc -c mod1.c dir/mod2.c\n"),
    ]
}

/// `compile_commands.json` for [`c_project_files`] rooted at `root`.
pub fn c_compile_commands(root: &Path, compiler: &str) -> String {
    let root = root.display();
    format!(
        r#"[
  {{
    "directory": "{root}",
    "arguments": ["{compiler}", "-c", "mod1.c", "-o", "mod1.o"],
    "file": "mod1.c"
  }},
  {{
    "directory": "{root}",
    "command": "{compiler} -I. -c dir/mod2.c -o dir/mod2.o",
    "file": "dir/mod2.c"
  }}
]
"#
    )
}

/// Initialize a repository at `root` and commit every file under it.
pub fn init_git_repo(root: &Path) -> Repository {
    let repo = Repository::init(root).expect("Failed to init repository");
    {
        let mut index = repo.index().expect("Failed to open index");
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .expect("Failed to add files");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = repo.find_tree(tree_id).expect("Failed to find tree");
        let sig = git2::Signature::now("Test", "test@example.com").expect("Failed to sign");
        repo.commit(Some("HEAD"), &sig, &sig, "initial commit\n", &tree, &[])
            .expect("Failed to commit");
    }
    repo
}

/// First of `clang`, `gcc` and `cc` found on `PATH`.
pub fn find_compiler() -> Option<&'static str> {
    let paths = std::env::var_os("PATH")?;
    let dirs: Vec<_> = std::env::split_paths(&paths).collect();
    ["clang", "gcc", "cc"]
        .into_iter()
        .find(|name| dirs.iter().any(|dir| dir.join(name).is_file()))
}

/// Entry of a written archive: member name, its kind, and its link target.
#[derive(Debug)]
pub struct Entry {
    pub name: PathBuf,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub link_name: Option<PathBuf>,
}

/// List the members of an uncompressed tar stream.
pub fn tar_entries(bytes: &[u8]) -> Vec<Entry> {
    let mut archive = tar::Archive::new(bytes);
    archive
        .entries()
        .expect("Failed to read archive")
        .map(|entry| {
            let entry = entry.expect("Failed to read entry");
            Entry {
                name: entry.path().expect("Failed to read entry path").into_owned(),
                is_dir: entry.header().entry_type().is_dir(),
                is_symlink: entry.header().entry_type().is_symlink(),
                link_name: entry
                    .link_name()
                    .expect("Failed to read link name")
                    .map(|p| p.into_owned()),
            }
        })
        .collect()
}

/// List the members of a `.tar.gz` file.
pub fn tar_gz_entries(path: &Path) -> Vec<Entry> {
    use std::io::Read;

    let file = std::fs::File::open(path).expect("Failed to open archive");
    let mut bytes = Vec::new();
    flate2::read::GzDecoder::new(file)
        .read_to_end(&mut bytes)
        .expect("Failed to decompress archive");
    tar_entries(&bytes)
}

/// Archive member name for an absolute path.
pub fn member_name(path: &Path) -> PathBuf {
    path.strip_prefix("/").unwrap_or(path).to_path_buf()
}

/// Fail if any member name occurs more than once.
pub fn assert_no_duplicate_members(entries: &[Entry]) {
    let mut seen = std::collections::HashSet::new();
    for entry in entries {
        assert!(
            seen.insert(entry.name.as_path()),
            "duplicate member {}: {entries:?}",
            entry.name.display()
        );
    }
}
