use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

/// Compiled regex patterns for redacting upload tokens from error messages.
///
/// Note: These patterns are static literals validated by tests, so the
/// expect() calls cannot fire on runtime input.
static REDACTION_PATTERNS: LazyLock<[(regex::Regex, &'static str); 2]> = LazyLock::new(|| {
    [
        (
            regex::Regex::new(r"(?i)(bearer\s+)[^\s]+")
                .expect("bearer redaction pattern is invalid"),
            "${1}[REDACTED]",
        ),
        (
            regex::Regex::new(r"(upload_token[=:\s]+)[^\s]+")
                .expect("upload_token redaction pattern is invalid"),
            "${1}[REDACTED]",
        ),
    ]
});

#[derive(Debug, Error)]
pub enum TerritoryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed compilation database {}: {message}", path.display())]
    MalformedDatabase { path: PathBuf, message: String },

    #[error("Repository error: {0}")]
    Repository(#[from] git2::Error),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Compiler probe failed for {}: {message}", file.display())]
    Probe { file: PathBuf, message: String },

    #[error("Cannot archive {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("{lang} scanner failed: {message}")]
    Scanner { lang: String, message: String },

    #[error("Authentication error: {}", redact_sensitive_data(.0))]
    Auth(String),

    #[error("Upload error: {}", redact_sensitive_data(message))]
    Upload {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Redact sensitive information from error messages.
fn redact_sensitive_data(message: &str) -> String {
    let mut result = message.to_string();
    for (pattern, replacement) in REDACTION_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }
    result
}

impl TerritoryError {
    pub fn no_compilation_database() -> Self {
        TerritoryError::Config("no compile_commands.json found".to_string())
    }

    pub fn not_a_repository() -> Self {
        TerritoryError::Config("not a git repository".to_string())
    }

    pub fn malformed_database(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        TerritoryError::MalformedDatabase {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a precondition failure reported before any work starts.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            TerritoryError::Config(_) | TerritoryError::MalformedDatabase { .. }
        )
    }
}

impl From<reqwest::Error> for TerritoryError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out. Check your network connection.".to_string()
        } else if err.is_connect() {
            "Failed to connect to server. Check your network connection.".to_string()
        } else if err.is_status() {
            format!(
                "HTTP error: {}",
                err.status()
                    .map_or("unknown".to_string(), |s| s.to_string())
            )
        } else {
            "Network request failed".to_string()
        };

        TerritoryError::Upload {
            message,
            source: Some(Box::new(err)),
        }
    }
}

/// Format an error for the terminal.
///
/// Configuration errors are short one-liners; everything else carries its
/// source chain when `verbose` is set.
pub fn format_error(error: &TerritoryError, verbose: bool) -> String {
    if error.is_config() {
        return format!("error: {error}");
    }

    let mut out = format!("error: {error}");
    if verbose {
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }
    }
    out
}
