//! Upload token storage.
//!
//! A token is read from a user-only file. When none exists the user is sent
//! to the authorizer page and asked to paste the token it shows, which is
//! then stored for later runs.

use crate::utils::error::TerritoryError;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_AUTHORIZER: &str = "https://app.territory.dev/upload-tokens/authorize-local";

/// `<user config dir>/Territory/upload_token`
pub fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Territory")
        .join("upload_token")
}

/// Read a stored token, `None` if the file does not exist.
pub fn read_token(path: &Path) -> Result<Option<String>, TerritoryError> {
    if !path.is_file() {
        return Ok(None);
    }
    let token = std::fs::read_to_string(path)?.trim().to_string();
    if token.is_empty() {
        return Err(TerritoryError::Auth(format!(
            "token file {} is empty",
            path.display()
        )));
    }
    Ok(Some(token))
}

/// Store `token` at `path`, readable only by the current user.
pub fn store_token(path: &Path, token: &str) -> Result<(), TerritoryError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(token.as_bytes())?;
    Ok(())
}

/// Return the stored token, or obtain one from the user and store it.
pub fn load_or_acquire_token(path: &Path, authorizer_url: &str) -> Result<String, TerritoryError> {
    if let Some(token) = read_token(path)? {
        println!("reading token from {}", path.display());
        return Ok(token);
    }

    let token = acquire_token(authorizer_url)?;
    println!("storing token in {}", path.display());
    store_token(path, &token)?;
    Ok(token)
}

fn acquire_token(authorizer_url: &str) -> Result<String, TerritoryError> {
    println!("Open the following page to create an upload token:");
    println!("  {authorizer_url}");
    let token = dialoguer::Password::new()
        .with_prompt("Upload token")
        .interact()
        .map_err(|e| TerritoryError::Auth(format!("could not read token: {e}")))?;

    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(TerritoryError::Auth("no token entered".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_then_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/upload_token");
        store_token(&path, "testtoken").expect("store");
        assert_eq!(read_token(&path).expect("read").as_deref(), Some("testtoken"));
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("upload_token");
        store_token(&path, "t").expect("store");
        let mode = std::fs::metadata(&path).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_token_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(read_token(&dir.path().join("none")).expect("read"), None);
    }

    #[test]
    fn test_stored_token_is_trimmed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("upload_token");
        std::fs::write(&path, "abc\n").expect("write");
        assert_eq!(
            load_or_acquire_token(&path, DEFAULT_AUTHORIZER).expect("load"),
            "abc"
        );
    }

    #[test]
    fn test_empty_token_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("upload_token");
        std::fs::write(&path, "  \n").expect("write");
        assert!(matches!(read_token(&path), Err(TerritoryError::Auth(_))));
    }
}
