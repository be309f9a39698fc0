use crate::utils::error::TerritoryError;
use git2::Repository;
use std::path::{Path, PathBuf};

/// Find the outermost directory at or above `path` that contains a `.git`
/// directory. Submodule checkouts therefore resolve to their superproject.
pub fn find_repo_root(path: &Path) -> Result<PathBuf, TerritoryError> {
    path.ancestors()
        .filter(|dir| dir.join(".git").is_dir())
        .last()
        .map(Path::to_path_buf)
        .ok_or_else(TerritoryError::not_a_repository)
}

/// Tracked files under `dir`, relative to `dir`, in index order.
pub fn list_repo_files(dir: &Path) -> Result<Vec<String>, TerritoryError> {
    let repo = Repository::discover(dir)?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| TerritoryError::Config("repository has no working directory".to_string()))?
        .canonicalize()?;
    let dir = dir.canonicalize()?;
    let scope = dir.strip_prefix(&workdir).unwrap_or(Path::new(""));

    let index = repo.index()?;
    let files = index
        .iter()
        .filter_map(|entry| {
            let tracked = PathBuf::from(String::from_utf8_lossy(&entry.path).into_owned());
            tracked
                .strip_prefix(scope)
                .ok()
                .map(|p| p.to_string_lossy().into_owned())
        })
        .collect();
    Ok(files)
}

/// Short name of the checked-out branch, or `HEAD` when detached.
pub fn get_branch(repo_root: &Path) -> Result<String, TerritoryError> {
    let repo = Repository::open(repo_root)?;
    let head = repo.head()?;
    Ok(head.shorthand().unwrap_or("HEAD").to_string())
}

pub fn get_sha(repo_root: &Path) -> Result<String, TerritoryError> {
    let repo = Repository::open(repo_root)?;
    let commit = repo.head()?.peel_to_commit()?;
    Ok(commit.id().to_string())
}

pub fn get_commit_message(repo_root: &Path) -> Result<String, TerritoryError> {
    let repo = Repository::open(repo_root)?;
    let commit = repo.head()?.peel_to_commit()?;
    Ok(commit.message().unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).expect("init");
        std::fs::create_dir_all(dir.join("sub")).expect("mkdir");
        std::fs::write(dir.join("top.c"), "int top;").expect("write");
        std::fs::write(dir.join("sub/inner.c"), "int inner;").expect("write");
        {
            let mut index = repo.index().expect("index");
            index.add_path(Path::new("top.c")).expect("add");
            index.add_path(Path::new("sub/inner.c")).expect("add");
            index.write().expect("write index");
            let tree_id = index.write_tree().expect("tree");
            let tree = repo.find_tree(tree_id).expect("find tree");
            let sig = git2::Signature::now("Test", "test@example.com").expect("sig");
            repo.commit(Some("HEAD"), &sig, &sig, "initial commit\n", &tree, &[])
                .expect("commit");
        }
        repo
    }

    #[test]
    fn test_find_repo_root_from_subdir() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_repo(dir.path());
        let root = find_repo_root(&dir.path().join("sub")).expect("root");
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_not_a_repository() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = find_repo_root(dir.path()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_list_repo_files_is_scoped() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_repo(dir.path());

        let mut all = list_repo_files(dir.path()).expect("list");
        all.sort();
        assert_eq!(all, vec!["sub/inner.c".to_string(), "top.c".to_string()]);

        let sub = list_repo_files(&dir.path().join("sub")).expect("list sub");
        assert_eq!(sub, vec!["inner.c".to_string()]);
    }

    #[test]
    fn test_commit_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_repo(dir.path());

        assert_eq!(get_sha(dir.path()).expect("sha").len(), 40);
        assert_eq!(
            get_commit_message(dir.path()).expect("message"),
            "initial commit\n"
        );
        assert!(!get_branch(dir.path()).expect("branch").is_empty());
    }
}
