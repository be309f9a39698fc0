use anyhow::Result;
use territory::utils::error::{TerritoryError, format_error};
use territory::{cli, run};

#[tokio::main]
async fn main() {
    // Config is not parsed yet when early errors surface
    let verbose = verbose_requested(std::env::args());

    if let Err(e) = run_main().await {
        display_error(&e, verbose);
        std::process::exit(1);
    }
}

/// Whether the raw command line asks for verbose output.
fn verbose_requested<I: IntoIterator<Item = String>>(args: I) -> bool {
    args.into_iter()
        .any(|arg| matches!(arg.as_str(), "-v" | "-vv" | "--verbose"))
}

/// Display an error with contextual formatting.
///
/// Tries to downcast to `TerritoryError` for rich formatting, falls back to
/// anyhow's error chain display for other errors.
fn display_error(error: &anyhow::Error, verbose: bool) {
    if let Some(territory_error) = error.downcast_ref::<TerritoryError>() {
        eprintln!("{}", format_error(territory_error, verbose));
        return;
    }

    eprintln!("\n\u{26a0} Error: {}", error);

    let causes: Vec<_> = error.chain().skip(1).collect();
    if !causes.is_empty() {
        eprintln!("\nCaused by:");
        for (i, cause) in causes.iter().enumerate() {
            let prefix = if i == causes.len() - 1 {
                "\u{2514}\u{2500}"
            } else {
                "\u{251c}\u{2500}"
            };
            eprintln!("{} {}", prefix, cause);
        }
    }

    if verbose {
        let backtrace = error.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            eprintln!("\nBacktrace:\n{}", backtrace);
        }
    }
}

async fn run_main() -> Result<()> {
    let args = cli::args::parse();

    let work_dir = cli::config::resolve_work_dir(&args)?;

    // Config files + TERRITORY_* variables
    let config = cli::config::load(&args, &work_dir)?;

    // CLI flags win over everything loaded above
    let merged_config = cli::config::merge_config(&args, config, work_dir);

    territory::init_logging(merged_config.verbose, merged_config.debug);

    run(merged_config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_verbose_flags_match_exactly() {
        assert!(verbose_requested(args(&["territory", "-v", "upload"])));
        assert!(verbose_requested(args(&["territory", "upload", "-vv"])));
        assert!(verbose_requested(args(&["territory", "--verbose"])));
    }

    #[test]
    fn test_values_starting_with_dash_v_are_ignored() {
        assert!(!verbose_requested(args(&[
            "territory",
            "upload",
            "--repo-id",
            "-vendor",
        ])));
        assert!(!verbose_requested(args(&["territory", "-C", "-v2-build"])));
    }
}
