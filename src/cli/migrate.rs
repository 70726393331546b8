//! Behavior migration commands (`to-family`, `to-members`).

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;

use crate::error::Result;
use crate::output::{display_path, plural, Printer};
use crate::project::{Direction, MigrationReport};

use super::GlobalArgs;

/// Move a behavior between a family and its members
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Project directory
    pub project: PathBuf,

    /// Family name
    pub family: String,

    /// Behavior name, as shown in the editor
    pub behavior: String,

    /// Member object types (default: the family's own member list)
    #[arg(long, value_delimiter = ',')]
    pub members: Option<Vec<String>>,
}

pub fn run(
    direction: Direction,
    args: MigrateArgs,
    global: &GlobalArgs,
    printer: &Printer,
) -> Result<()> {
    let mut ctx = super::open_project(&args.project, global, printer)?;
    if ctx.diagnostics().has_errors() {
        printer.diagnostics(ctx.diagnostics());
    }

    let result = ctx.migrate(
        direction,
        &args.family,
        args.members.as_deref(),
        &args.behavior,
    );
    if let Ok(report) = &result {
        print_report(report, printer);
    }
    super::finish(&ctx, printer);

    result.map(|_| ())
}

fn print_report(report: &MigrationReport, printer: &Printer) {
    let verb = match report.direction {
        Direction::ToFamily => "Consolidated",
        Direction::ToMembers => "Distributed",
    };
    printer.status(
        verb,
        &format!(
            "{} ({}, {})",
            report.behavior_name,
            behavior_id_label(&report.behavior_id),
            plural(report.written.len(), "file", "files")
        ),
    );
    for path in &report.written {
        printer.info("Wrote", &display_path(path));
    }
    printer.info("Sids", &printer.dim(&sid_list(&report.sids)));
}

fn behavior_id_label(id: &Value) -> String {
    id.as_str().map_or_else(|| id.to_string(), str::to_string)
}

fn sid_list(sids: &[u64]) -> String {
    sids.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
}
