//! Append-only diagnostic log collected while loading a project.
//!
//! Load-time problems (missing definitions, malformed JSON, missing
//! images) never abort a load; they are pushed here instead. Every entry
//! is also forwarded to the `log` facade at debug or trace level.

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::storage::Storage;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Diagnostic codes emitted by the loader.
pub mod codes {
    pub const LOAD_FOLDER: &str = "crawler::load::folder";
    pub const LOAD_ITEM: &str = "crawler::load::item";
    pub const LOAD_MISSING: &str = "crawler::load::missing";
    pub const LOAD_PARSE: &str = "crawler::load::parse";
    pub const LOAD_READ: &str = "crawler::load::read";
    pub const LAYOUT_MISSING: &str = "crawler::load::layout";
    pub const TEMPLATE_MISSING: &str = "crawler::load::template";
    pub const ASSET_MISSING: &str = "crawler::assets::missing";
    pub const ASSET_DECODE: &str = "crawler::assets::decode";
    pub const PROJECT_OPENED: &str = "crawler::project::opened";
}

/// A single load diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Machine-readable code (e.g. "crawler::load::missing").
    pub code: String,
    pub message: String,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            help: None,
        }
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.severity, self.message)
    }
}

/// `log` target diagnostics are forwarded under.
pub const LOG_TARGET: &str = "crawler::diagnostics";

/// Level a diagnostic is forwarded to the `log` facade at.
pub fn forwarded_level(severity: Severity) -> log::Level {
    match severity {
        Severity::Info => log::Level::Trace,
        Severity::Warning | Severity::Error => log::Level::Debug,
    }
}

/// Ordered, append-only collection of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic and forward it to the `log` facade.
    ///
    /// Entries are forwarded below `info` under the `crawler::diagnostics`
    /// target; callers surface the log themselves.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        log::log!(
            target: LOG_TARGET,
            forwarded_level(diagnostic.severity),
            "[{}] {}",
            diagnostic.code,
            diagnostic.message
        );
        self.entries.push(diagnostic);
    }

    pub fn info(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::info(code, message));
    }

    pub fn warning(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::warning(code, message));
    }

    pub fn error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::error(code, message));
    }

    /// Append entries collected elsewhere, without re-logging them.
    pub fn extend(&mut self, other: DiagnosticLog) {
        self.entries.extend(other.entries);
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Entries at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity >= severity)
    }

    /// Render the log as `[LEVEL]: message` lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.entries {
            out.push_str(&d.to_string());
            out.push('\n');
        }
        out
    }

    /// Write the rendered log to `path`. Does nothing if the log is empty.
    pub fn export(&self, storage: &dyn Storage, path: &Path) -> Result<bool> {
        if self.entries.is_empty() {
            return Ok(false);
        }
        storage.write_text(path, &self.render())?;
        Ok(true)
    }
}
