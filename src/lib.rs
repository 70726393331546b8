//! crawler - Construct project tree loader and behavior mover
//!
//! Loads a Construct project directory (manifest, object types, families,
//! layouts), resolves the image assets each object type expects, and moves
//! behaviors between a family and its member object types while keeping
//! every definition file byte-consistent with its in-memory document.

pub mod cli;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod project;
pub mod storage;

pub use config::Config;
pub use context::AppContext;
pub use diagnostics::{Diagnostic, DiagnosticLog, Severity};
pub use error::{CrawlerError, Result};
pub use project::{
    open_project, open_project_with, Direction, EntityKind, EntityRecord, LoadOptions,
    LoadedProject, MigrationReport, ProjectIndex,
};
pub use storage::{FsStorage, MemoryStorage, Storage};
