//! Concurrent dependency collection over a whole compilation database.

use super::database::CompilationDatabase;
use super::extractor::{DependencyCollectionResult, query_details};
use crate::utils::error::TerritoryError;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default probe concurrency: two compiler processes per core, since probes
/// spend much of their time blocked on file IO.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(2)
}

/// Outcome of one worker task, tagged with the entry it belongs to.
type TaskOutcome = (usize, PathBuf, Result<DependencyCollectionResult, TerritoryError>);

/// Probe every entry of `database` with at most `workers` compilers running.
///
/// Returns the union of all dependency sets plus every entry's own source
/// file, which is included even when its probe fails. Rewritten arguments are
/// written back into `database` by index; an entry whose task failed keeps
/// its loaded arguments. Only this function touches the accumulator and the
/// database, so workers never share mutable state.
pub async fn collect_details(
    tmp_dir: &Path,
    database: &mut CompilationDatabase,
    workers: usize,
    progress: &ProgressBar,
) -> HashSet<PathBuf> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
    let mut dep_paths = HashSet::new();

    for (index, command) in database.iter().enumerate() {
        dep_paths.insert(command.source_path());

        let command = command.clone();
        let tmp_dir = tmp_dir.to_path_buf();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let file = command.file.clone();
            let permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let err = TerritoryError::Probe {
                        file: file.clone(),
                        message: format!("worker pool closed: {e}"),
                    };
                    return (index, file, Err(err));
                }
            };

            let probed = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                query_details(index, &tmp_dir, &command)
            })
            .await;

            let result = match probed {
                Ok(result) => result,
                Err(join_err) => Err(TerritoryError::Probe {
                    file: file.clone(),
                    message: format!("worker panicked: {join_err}"),
                }),
            };
            (index, file, result)
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, _file, Ok(details))) => {
                debug_assert_eq!(index, details.index);
                dep_paths.extend(details.paths);
                if let Some(entry) = database.get_mut(details.index) {
                    entry.arguments = details.rewritten_arguments;
                }
            }
            Ok((index, file, Err(e))) => {
                failed += 1;
                tracing::error!("entry {index} ({}): {e}", file.display());
            }
            Err(e) => {
                failed += 1;
                tracing::error!("collection task failed: {e}");
            }
        }
        progress.inc(1);
    }

    tracing::info!(
        "collected {} paths from {} translation units ({} failed)",
        dep_paths.len(),
        database.len(),
        failed
    );
    dep_paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cc::database::CompilationCommand;

    #[test]
    fn test_default_workers_is_positive() {
        assert!(default_workers() >= 2);
    }

    #[tokio::test]
    async fn test_failed_entries_still_contribute_sources() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let commands = (0..3)
            .map(|i| CompilationCommand {
                file: PathBuf::from(format!("unit{i}.c")),
                directory: tmp.path().to_path_buf(),
                arguments: vec![
                    "/nonexistent/territory-test-cc".to_string(),
                    "-c".to_string(),
                    format!("unit{i}.c"),
                ],
                output: None,
            })
            .collect();
        let mut database = CompilationDatabase::new(commands);
        let before = database.clone();

        let paths = collect_details(tmp.path(), &mut database, 2, &ProgressBar::hidden()).await;

        assert_eq!(paths.len(), 3);
        for i in 0..3 {
            assert!(paths.contains(&tmp.path().join(format!("unit{i}.c"))));
        }
        assert_eq!(database, before);
    }

    /// Compiler stand-in that records `main.c` and `hdr.h` from its working
    /// directory as dependencies, then lingers so concurrent runs overlap.
    #[cfg(unix)]
    fn write_fake_compiler(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-cc");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             dep=\n\
             for a in \"$@\"; do case \"$a\" in -MF*) dep=\"${a#-MF}\";; esac; done\n\
             printf 'x.o: %s/main.c %s/hdr.h\\n' \"$(pwd)\" \"$(pwd)\" > \"$dep\"\n\
             sleep 1\n",
        )
        .expect("write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_same_relative_file_in_two_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let base = tmp.path().canonicalize().expect("canonicalize");
        let root = base.join("repo");
        let scratch = base.join("scratch");
        let compiler = write_fake_compiler(&base);

        let commands = ["a", "b", "b"]
            .iter()
            .map(|sub| {
                let directory = root.join(sub);
                std::fs::create_dir_all(&directory).expect("mkdir");
                CompilationCommand {
                    file: PathBuf::from("main.c"),
                    directory,
                    arguments: vec![
                        compiler.display().to_string(),
                        "-c".to_string(),
                        "main.c".to_string(),
                    ],
                    output: None,
                }
            })
            .collect();
        let mut database = CompilationDatabase::new(commands);

        let paths = collect_details(&scratch, &mut database, 3, &ProgressBar::hidden()).await;

        for sub in ["a", "b"] {
            for name in ["main.c", "hdr.h"] {
                let expected = root.join(sub).join(name);
                assert!(paths.contains(&expected), "{} lost: {paths:?}", expected.display());
            }
        }
        assert_eq!(paths.len(), 4, "{paths:?}");
    }

    #[tokio::test]
    async fn test_empty_database() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut database = CompilationDatabase::default();
        let bar = ProgressBar::hidden();
        let paths = collect_details(tmp.path(), &mut database, 4, &bar).await;
        assert!(paths.is_empty());
        assert_eq!(bar.position(), 0);
    }
}
