use crate::cc::collector::{collect_details, default_workers};
use crate::cc::database::{COMPILE_COMMANDS_FILE, CompilationDatabase, find_compile_commands_dir};
use crate::packer::archive::PathArchiver;
use crate::packer::package::Package;
use crate::utils::error::TerritoryError;
use crate::utils::progress::{ProgressManager, stages};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::PathBuf;

/// C and C++ via a clang compilation database.
#[derive(Debug)]
pub struct CLang {
    jobs: Option<usize>,
    prepared: Option<Prepared>,
}

#[derive(Debug)]
struct Prepared {
    compile_commands_dir: PathBuf,
    /// Location of the original database; the rewritten copy is archived here
    cc_path: PathBuf,
    /// Rewritten database in the temp dir
    generated_path: PathBuf,
}

impl CLang {
    pub fn new(jobs: Option<usize>) -> Self {
        Self {
            jobs,
            prepared: None,
        }
    }

    /// Load the database nearest to the work dir, probe every entry, capture
    /// the dependency closure, and save the rewritten database.
    pub async fn prepare_package(
        &mut self,
        package: &mut Package,
        progress: &mut ProgressManager,
    ) -> Result<(), TerritoryError> {
        let compile_commands_dir = find_compile_commands_dir(&package.work_dir)?;
        let cc_path = compile_commands_dir.join(COMPILE_COMMANDS_FILE);
        println!("compilation database: {}", cc_path.display());

        let mut database = CompilationDatabase::load(&cc_path)?;
        let workers = self.jobs.unwrap_or_else(default_workers);
        tracing::debug!(
            "probing {} translation units with {} workers",
            database.len(),
            workers
        );

        let bar = progress.add_stage(stages::COLLECTING, database.len() as u64);
        let files = collect_details(&package.temp_dir, &mut database, workers, &bar).await;
        progress.finish(
            stages::COLLECTING,
            &format!("collected details for {} translation units", database.len()),
        );
        package.captured_files.extend(files);

        let generated_path = package.temp_dir.join(COMPILE_COMMANDS_FILE);
        database.save(&generated_path)?;

        self.prepared = Some(Prepared {
            compile_commands_dir,
            cc_path,
            generated_path,
        });
        Ok(())
    }

    pub fn add_to_archive<W: Write>(&self, archiver: &mut PathArchiver<W>) -> Result<(), TerritoryError> {
        let prepared = self.prepared()?;
        archiver.add_file_as(&prepared.generated_path, &prepared.cc_path)
    }

    pub fn add_to_meta(&self, meta: &mut Map<String, Value>) {
        if let Some(prepared) = &self.prepared {
            meta.insert(
                "compile_commands_dir".to_string(),
                Value::String(prepared.compile_commands_dir.display().to_string()),
            );
        }
    }

    fn prepared(&self) -> Result<&Prepared, TerritoryError> {
        self.prepared.as_ref().ok_or_else(|| {
            TerritoryError::Config("compilation database was not collected".to_string())
        })
    }
}
