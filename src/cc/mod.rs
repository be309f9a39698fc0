//! Compilation database processing.
//!
//! [`database`] loads `compile_commands.json`, [`extractor`] probes a single
//! translation unit with the help of [`arguments`] and [`verbose`], and
//! [`collector`] runs the probes for a whole database concurrently.

pub mod arguments;
pub mod collector;
pub mod database;
pub mod extractor;
pub mod verbose;

pub use collector::collect_details;
pub use database::{CompilationCommand, CompilationDatabase};
pub use extractor::DependencyCollectionResult;
pub use verbose::{VerboseProbeResult, parse_verbose_output};
