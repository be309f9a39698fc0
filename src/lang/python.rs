use super::{Language, run_scanner, scanner_args};
use crate::packer::package::Package;
use crate::utils::error::TerritoryError;
use std::ffi::{OsStr, OsString};

pub const DEFAULT_INTERPRETER: &str = "python";

/// Module implementing the Python indexer.
const SCANNER_MODULE: &str = "territory_python_scanner";

/// Python via the `territory_python_scanner` module.
#[derive(Debug)]
pub struct PythonLang {
    interpreter: String,
}

impl PythonLang {
    pub fn new(interpreter: String) -> Self {
        Self { interpreter }
    }

    fn command_args(&self, package: &Package) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-m".into(), SCANNER_MODULE.into()];
        args.extend(scanner_args(
            &package.repo_root,
            &package.uim_temp_dir(),
            package.index_system,
        ));
        args
    }

    /// Scan the whole repository, writing into `<temp>/uim`.
    pub async fn prepare_package(&mut self, package: &mut Package) -> Result<(), TerritoryError> {
        let args = self.command_args(package);
        run_scanner(Language::Python, OsStr::new(&self.interpreter), &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_scans_repo_root() {
        let package = Package::new(
            PathBuf::from("/repo/sub"),
            PathBuf::from("/tmp/t"),
            PathBuf::from("/repo"),
            true,
        );
        let args = PythonLang::new(DEFAULT_INTERPRETER.to_string()).command_args(&package);
        assert_eq!(
            args,
            vec!["-m", SCANNER_MODULE, "--system", "/repo", "/tmp/t/uim"]
        );
    }
}
