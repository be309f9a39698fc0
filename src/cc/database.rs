//! Loading and saving `compile_commands.json`.

use crate::utils::error::TerritoryError;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

/// File name of a clang compilation database.
pub const COMPILE_COMMANDS_FILE: &str = "compile_commands.json";

/// One entry as it appears on disk, before normalization.
#[derive(Debug, Deserialize)]
struct RawCommand {
    file: PathBuf,
    directory: Option<PathBuf>,
    command: Option<String>,
    arguments: Option<Vec<String>>,
    output: Option<PathBuf>,
}

/// A single compiler invocation with its argument list already split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilationCommand {
    pub file: PathBuf,
    pub directory: PathBuf,
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl CompilationCommand {
    /// Absolute path of the translation unit's source file.
    pub fn source_path(&self) -> PathBuf {
        self.directory.join(&self.file)
    }
}

/// The ordered list of compilation commands. Entries are addressed by index
/// so concurrent workers can report back without matching on file names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilationDatabase {
    commands: Vec<CompilationCommand>,
}

impl CompilationDatabase {
    pub fn new(commands: Vec<CompilationCommand>) -> Self {
        Self { commands }
    }

    /// Read a compilation database, splitting any `command` strings.
    ///
    /// Entries without a `directory` are taken relative to the directory that
    /// contains the database file.
    pub fn load(path: &Path) -> Result<Self, TerritoryError> {
        let text = std::fs::read_to_string(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::parse(&text, &base_dir).map_err(|message| TerritoryError::malformed_database(path, message))
    }

    fn parse(text: &str, base_dir: &Path) -> Result<Self, String> {
        let raw: Vec<RawCommand> = serde_json::from_str(text).map_err(|e| e.to_string())?;

        let commands = raw
            .into_iter()
            .enumerate()
            .map(|(i, entry)| normalize(i, entry, base_dir))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { commands })
    }

    /// Write the database back in `arguments` form.
    pub fn save(&self, path: &Path) -> Result<(), TerritoryError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| TerritoryError::malformed_database(path, e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompilationCommand> {
        self.commands.iter()
    }

    pub fn get(&self, index: usize) -> Option<&CompilationCommand> {
        self.commands.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CompilationCommand> {
        self.commands.get_mut(index)
    }
}

impl Index<usize> for CompilationDatabase {
    type Output = CompilationCommand;

    fn index(&self, index: usize) -> &Self::Output {
        &self.commands[index]
    }
}

impl IndexMut<usize> for CompilationDatabase {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.commands[index]
    }
}

impl<'a> IntoIterator for &'a CompilationDatabase {
    type Item = &'a CompilationCommand;
    type IntoIter = std::slice::Iter<'a, CompilationCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

fn normalize(index: usize, entry: RawCommand, base_dir: &Path) -> Result<CompilationCommand, String> {
    let arguments = match (entry.arguments, entry.command) {
        (Some(arguments), _) => arguments,
        (None, Some(command)) => shlex::split(&command)
            .ok_or_else(|| format!("entry {index}: cannot split command line: {command}"))?,
        (None, None) => {
            return Err(format!(
                "entry {index} ({}) has neither `command` nor `arguments`",
                entry.file.display()
            ));
        }
    };

    if arguments.is_empty() {
        return Err(format!(
            "entry {index} ({}) has an empty argument list",
            entry.file.display()
        ));
    }

    let directory = match entry.directory {
        Some(dir) if !dir.as_os_str().is_empty() => base_dir.join(dir),
        _ => base_dir.to_path_buf(),
    };

    Ok(CompilationCommand {
        file: entry.file,
        directory,
        arguments,
        output: entry.output,
    })
}

/// Find the nearest directory at or above `start` containing a compilation database.
pub fn find_compile_commands_dir(start: &Path) -> Result<PathBuf, TerritoryError> {
    start
        .ancestors()
        .find(|dir| dir.join(COMPILE_COMMANDS_FILE).exists())
        .map(Path::to_path_buf)
        .ok_or_else(TerritoryError::no_compilation_database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_string_is_split_once() {
        let text = r#"[{"directory": "/src", "file": "a b.c", "command": "cc -DNAME='\"x y\"' -c 'a b.c'"}]"#;
        let db = CompilationDatabase::parse(text, Path::new("/db")).expect("parse");
        assert_eq!(
            db[0].arguments,
            vec!["cc", "-DNAME=\"x y\"", "-c", "a b.c"]
        );
        assert_eq!(db[0].directory, PathBuf::from("/src"));
    }

    #[test]
    fn test_arguments_take_precedence() {
        let text = r#"[{"directory": "/src", "file": "a.c", "arguments": ["cc", "a.c"], "command": "ignored"}]"#;
        let db = CompilationDatabase::parse(text, Path::new("/db")).expect("parse");
        assert_eq!(db[0].arguments, vec!["cc", "a.c"]);
    }

    #[test]
    fn test_directory_defaults_to_database_dir() {
        let text = r#"[{"file": "a.c", "arguments": ["cc", "a.c"]}]"#;
        let db = CompilationDatabase::parse(text, Path::new("/db")).expect("parse");
        assert_eq!(db[0].directory, PathBuf::from("/db"));
        assert_eq!(db[0].source_path(), PathBuf::from("/db/a.c"));
    }

    #[test]
    fn test_absolute_file_wins_over_directory() {
        let cmd = CompilationCommand {
            file: PathBuf::from("/abs/a.c"),
            directory: PathBuf::from("/src"),
            arguments: vec!["cc".to_string()],
            output: None,
        };
        assert_eq!(cmd.source_path(), PathBuf::from("/abs/a.c"));
    }

    #[test]
    fn test_missing_command_and_arguments() {
        let text = r#"[{"directory": "/src", "file": "a.c"}]"#;
        let err = CompilationDatabase::parse(text, Path::new("/db")).unwrap_err();
        assert!(err.contains("neither"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(CompilationDatabase::parse("{not json", Path::new("/db")).is_err());
    }

    #[test]
    fn test_unbalanced_quotes_rejected() {
        let text = r#"[{"directory": "/src", "file": "a.c", "command": "cc 'a.c"}]"#;
        assert!(CompilationDatabase::parse(text, Path::new("/db")).is_err());
    }

    #[test]
    fn test_save_emits_arguments_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join(COMPILE_COMMANDS_FILE);
        std::fs::write(
            &src,
            r#"[{"directory": "/src", "file": "a.c", "command": "cc -c a.c"}]"#,
        )
        .expect("write");

        let db = CompilationDatabase::load(&src).expect("load");
        let out = dir.path().join("out.json");
        db.save(&out).expect("save");

        let saved = std::fs::read_to_string(&out).expect("read");
        assert!(!saved.contains("\"command\""));
        let reloaded = CompilationDatabase::load(&out).expect("reload");
        assert_eq!(reloaded, db);
    }

    #[test]
    fn test_load_reports_malformed_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join(COMPILE_COMMANDS_FILE);
        std::fs::write(&src, "[{]").expect("write");
        let err = CompilationDatabase::load(&src).unwrap_err();
        assert!(matches!(err, TerritoryError::MalformedDatabase { .. }));
    }

    #[test]
    fn test_find_compile_commands_dir_walks_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(COMPILE_COMMANDS_FILE), "[]").expect("write");
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("mkdir");

        assert_eq!(
            find_compile_commands_dir(&nested).expect("found"),
            dir.path().to_path_buf()
        );
    }
}
