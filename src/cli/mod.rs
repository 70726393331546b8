pub mod check;
pub mod completions;
pub mod list;
pub mod migrate;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use crate::output::{display_path, Printer};
use crate::storage::FsStorage;

/// crawler - Construct project tree loader and behavior mover
#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (default: <project>/crawler.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List object types and families in discovery order
    List(list::ListArgs),

    /// Load a project and report missing or malformed files
    Check(check::CheckArgs),

    /// Move a behavior from member object types into their family
    ToFamily(migrate::MigrateArgs),

    /// Move a behavior from a family into each of its members
    ToMembers(migrate::MigrateArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Load configuration and open the project at `project`.
pub(crate) fn open_project(
    project: &Path,
    global: &GlobalArgs,
    printer: &Printer,
) -> Result<AppContext<FsStorage>> {
    let storage = FsStorage::new();
    let config = Config::discover(&storage, project, global.config.as_deref())?;
    let mut ctx = AppContext::new(storage, config);

    printer.status("Opening", &display_path(project));
    ctx.open_with(project, printer)?;
    Ok(ctx)
}

/// Dump the diagnostic log and tell the user where it went.
///
/// A failed dump is only a warning: by the time it runs, the command's
/// own work is done and may already be on disk.
pub(crate) fn finish(ctx: &AppContext<FsStorage>, printer: &Printer) {
    match ctx.dump_log() {
        Ok(Some(path)) => printer.info("Log", &display_path(&path)),
        Ok(None) => {}
        Err(e) => printer.warning("Log", &format!("could not write diagnostic log: {}", e)),
    }
}
