use super::{Language, run_scanner, scanner_args};
use crate::packer::package::Package;
use crate::utils::error::TerritoryError;
use std::path::PathBuf;

/// Environment variable naming the Go scanner binary.
pub const GOSCAN_PATH_ENV: &str = "GOSCAN_PATH";

/// Go via the external `goscan` indexer.
#[derive(Debug)]
pub struct GoLang {
    scanner_path: Option<PathBuf>,
}

impl GoLang {
    pub fn new(scanner_path: Option<PathBuf>) -> Self {
        Self { scanner_path }
    }

    /// Platform key of the prebuilt scanner, e.g. `goscan-linux-x86_64`.
    pub fn binary_key() -> String {
        format!("goscan-{}-{}", std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Run the scanner over the work dir, writing into `<temp>/uim`.
    pub async fn prepare_package(&mut self, package: &mut Package) -> Result<(), TerritoryError> {
        let scanner = self.scanner_path.clone().ok_or_else(|| {
            TerritoryError::Config(format!(
                "no Go scanner configured for platform {}; set {GOSCAN_PATH_ENV}",
                Self::binary_key()
            ))
        })?;

        let args = scanner_args(&package.work_dir, &package.uim_temp_dir(), package.index_system);
        run_scanner(Language::Go, scanner.as_os_str(), &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_key_mentions_platform() {
        let key = GoLang::binary_key();
        assert!(key.starts_with("goscan-"));
        assert!(key.contains(std::env::consts::ARCH));
    }

    #[tokio::test]
    async fn test_missing_scanner_is_config_error() {
        let mut package = Package::new(
            PathBuf::from("/repo"),
            PathBuf::from("/tmp/t"),
            PathBuf::from("/repo"),
            false,
        );
        let err = GoLang::new(None)
            .prepare_package(&mut package)
            .await
            .unwrap_err();
        assert!(err.is_config());
    }
}
