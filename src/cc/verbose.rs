//! Parsing of compiler `-v` diagnostic output.

use regex::Regex;
use std::sync::LazyLock;

static TARGET_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Target: (.+?)\r?$").expect("target pattern is invalid"));

const ANGLE_INCLUDE_HEADER: &str = "#include <...> search starts here:";

const ANNOTATIONS: &[&str] = &[" (framework directory)", " (headermap)", "headermap)"];

/// What the compiler told us about its effective configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerboseProbeResult {
    pub target: Option<String>,
    /// `None` when the search-list block is absent; `Some(vec![])` when it
    /// was printed but listed nothing.
    pub angle_bracket_include_paths: Option<Vec<String>>,
}

/// Extract the target triple and the `#include <...>` search list from
/// verbose compiler output.
pub fn parse_verbose_output(text: &str) -> VerboseProbeResult {
    let target = TARGET_LINE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    VerboseProbeResult {
        target,
        angle_bracket_include_paths: parse_include_block(text),
    }
}

fn parse_include_block(text: &str) -> Option<Vec<String>> {
    let mut lines = text.lines();
    lines.find(|line| line.trim_end() == ANGLE_INCLUDE_HEADER)?;

    let dirs = lines
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .take_while(|line| line.starts_with(' '))
        .map(|line| strip_annotation(&line[1..]).to_string())
        .collect();
    Some(dirs)
}

fn strip_annotation(entry: &str) -> &str {
    ANNOTATIONS
        .iter()
        .find_map(|suffix| entry.strip_suffix(suffix))
        .unwrap_or(entry)
}
