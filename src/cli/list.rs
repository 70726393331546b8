//! List command implementation.
//!
//! Opens a project and prints its object types and families in the order
//! the editor shows them.

use std::path::PathBuf;

use clap::Args;

use crate::error::Result;
use crate::output::{plural, Printer};
use crate::project::{EntityRecord, ProjectIndex};

use super::GlobalArgs;

/// List object types and families
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub project: PathBuf,

    /// Only list families
    #[arg(long)]
    pub families: bool,

    /// Show behaviors attached to each entry
    #[arg(long)]
    pub behaviors: bool,
}

pub fn run(args: ListArgs, global: &GlobalArgs, printer: &Printer) -> Result<()> {
    let ctx = super::open_project(&args.project, global, printer)?;
    let Some(index) = ctx.index() else {
        return Ok(());
    };

    let mut out = String::new();
    if !args.families {
        render_section(&mut out, "Object types", index.object_types(), args.behaviors);
    }
    render_section(&mut out, "Families", index.families(), args.behaviors);
    print!("{}", out);

    printer.status("Listed", &summary(index));
    super::finish(&ctx, printer);
    Ok(())
}

fn summary(index: &ProjectIndex) -> String {
    format!(
        "{}, {}, {}",
        plural(index.object_types().len(), "object type", "object types"),
        plural(index.families().len(), "family", "families"),
        plural(index.layouts().len(), "layout", "layouts"),
    )
}

fn render_section(out: &mut String, title: &str, records: &[EntityRecord], behaviors: bool) {
    out.push_str(title);
    out.push_str(":\n");
    for record in records {
        out.push_str("  ");
        if !record.folder.is_empty() {
            out.push_str(&record.folder);
            out.push('/');
        }
        out.push_str(&record.name);
        if !record.is_loaded() {
            out.push_str(" (not loaded)");
        } else if behaviors {
            let names: Vec<String> = record.behavior_types().into_iter().map(|b| b.name).collect();
            if !names.is_empty() {
                out.push_str(" [");
                out.push_str(&names.join(", "));
                out.push(']');
            }
        }
        out.push('\n');
    }
}
