//! Terminal output for the crawler CLI.
//!
//! Status lines use Cargo-style right-aligned verbs and go to stderr;
//! listings go to stdout so they can be piped.

use std::io::{self, IsTerminal, Write};
use std::path::Path;

use crate::diagnostics::{Diagnostic, DiagnosticLog, Severity};
use crate::project::{LoadObserver, LoadProgress};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Width for right-aligned verb column.
const VERB_WIDTH: usize = 12;

/// Terminal-aware status printer. Colour is on when stderr is a terminal.
pub struct Printer {
    color: bool,
    verbose: bool,
}

impl Printer {
    pub fn new(verbose: bool) -> Self {
        Self {
            color: io::stderr().is_terminal(),
            verbose,
        }
    }

    /// e.g. "     Loading objectTypes/enemies (3/12)"
    pub fn status(&self, verb: &str, message: &str) {
        self.print_line(GREEN, verb, message);
    }

    pub fn info(&self, verb: &str, message: &str) {
        self.print_line(CYAN, verb, message);
    }

    pub fn warning(&self, verb: &str, message: &str) {
        self.print_line(YELLOW, verb, message);
    }

    pub fn error(&self, verb: &str, message: &str) {
        self.print_line(RED, verb, message);
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    /// Print one load diagnostic. Info entries only show in verbose mode.
    pub fn diagnostic(&self, d: &Diagnostic) {
        match d.severity {
            Severity::Info if self.verbose => self.info("info", &d.message),
            Severity::Info => {}
            Severity::Warning => self.warning("warning", &d.message),
            Severity::Error => self.error("error", &d.message),
        }
        if d.severity > Severity::Info {
            if let Some(help) = &d.help {
                eprintln!("{:>VERB_WIDTH$} {}", "", self.dim(&format!("help: {}", help)));
            }
        }
    }

    /// Print every diagnostic followed by a summary line.
    pub fn diagnostics(&self, log: &DiagnosticLog) {
        for d in log.iter() {
            self.diagnostic(d);
        }

        let errors = log.error_count();
        let warnings = log.warning_count();
        if errors > 0 {
            self.error(
                "Loaded",
                &format!(
                    "with {} and {}",
                    plural(errors, "error", "errors"),
                    plural(warnings, "warning", "warnings")
                ),
            );
        } else if warnings > 0 {
            self.warning("Loaded", &format!("with {}", plural(warnings, "warning", "warnings")));
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn print_line(&self, color: &str, verb: &str, message: &str) {
        let mut stderr = io::stderr().lock();
        if self.color {
            let _ = writeln!(stderr, "{BOLD}{color}{verb:>VERB_WIDTH$}{RESET} {message}");
        } else {
            let _ = writeln!(stderr, "{verb:>VERB_WIDTH$} {message}");
        }
    }
}

impl LoadObserver for Printer {
    fn progress(&self, update: &LoadProgress<'_>) {
        if !self.verbose {
            return;
        }
        let folder = if update.folder.is_empty() {
            update.kind.dir_name().to_string()
        } else {
            format!("{}/{}", update.kind.dir_name(), update.folder)
        };
        self.status(
            "Loading",
            &format!("{} ({}/{})", folder, update.current, update.total),
        );
    }
}

/// Pluralize a count: `plural(1, "family", "families")` → "1 family".
pub fn plural(n: usize, singular: &str, pluralized: &str) -> String {
    if n == 1 {
        format!("{} {}", n, singular)
    } else {
        format!("{} {}", n, pluralized)
    }
}

/// Return a relative display path when possible, absolute otherwise.
pub fn display_path(path: &Path) -> String {
    let relative = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(|p| p.display().to_string()));
    match relative {
        Some(s) if s.is_empty() => ".".to_string(),
        Some(s) => s,
        None => path.display().to_string(),
    }
}
