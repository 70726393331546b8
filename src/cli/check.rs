//! Check command implementation.

use std::path::PathBuf;

use clap::Args;

use crate::error::{CrawlerError, Result};
use crate::output::{plural, Printer};

use super::GlobalArgs;

/// Load a project and report problems
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub project: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: CheckArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let ctx = super::open_project(&args.project, global, printer)?;
    let log = ctx.diagnostics();
    printer.diagnostics(log);
    super::finish(&ctx, printer);

    let errors = log.error_count();
    let warnings = log.warning_count();
    let failed = errors > 0 || (args.strict && warnings > 0);
    if failed {
        return Err(CrawlerError::CheckFailed {
            path: args.project,
            message: format!(
                "{} and {}",
                plural(errors, "error", "errors"),
                plural(warnings, "warning", "warnings")
            ),
        });
    }

    if let Some(index) = ctx.index() {
        printer.status(
            "Checked",
            &format!(
                "{} ({}, {})",
                index.name(),
                plural(index.object_types().len(), "object type", "object types"),
                plural(index.families().len(), "family", "families"),
            ),
        );
    }
    Ok(())
}
