use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for crawler operations
#[derive(Error, Diagnostic, Debug)]
pub enum CrawlerError {
    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(crawler::io))]
    Io { path: PathBuf, message: String },

    #[error("File not found: {path}")]
    #[diagnostic(code(crawler::not_found))]
    NotFound { path: PathBuf },

    #[error("Parse error in {path}: {message}")]
    #[diagnostic(code(crawler::parse))]
    Parse {
        path: PathBuf,
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Cannot migrate behavior: {message}")]
    #[diagnostic(code(crawler::migration))]
    MigrationPrecondition {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to persist {} file(s):\n  {}", failed.len(), format_failures(failed))]
    #[diagnostic(
        code(crawler::persist),
        help("Files written before the failure were not rolled back; reopen the project before retrying")
    )]
    PersistFailure { failed: Vec<(PathBuf, String)> },

    #[error("Check failed for {path}: {message}")]
    #[diagnostic(code(crawler::check), help("See the diagnostics above or the dumped log"))]
    CheckFailed { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(crawler::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CrawlerError {
    /// Map an `std::io::Error` for `path`, keeping not-found distinct.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            CrawlerError::NotFound { path }
        } else {
            CrawlerError::Io {
                path,
                message: err.to_string(),
            }
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        CrawlerError::MigrationPrecondition {
            message: message.into(),
            help: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CrawlerError::NotFound { .. })
    }
}

fn format_failures(failed: &[(PathBuf, String)]) -> String {
    failed
        .iter()
        .map(|(path, message)| format!("{}: {}", path.display(), message))
        .collect::<Vec<_>>()
        .join("\n  ")
}

pub type Result<T> = std::result::Result<T, CrawlerError>;
