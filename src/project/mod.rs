//! Project loading and behavior migration.
//!
//! A project is a directory with a `project.c3proj` manifest and one JSON
//! definition per object type and family. Opening it produces a
//! [`ProjectIndex`]; behaviors are then moved between families and their
//! members through methods on that index.
//!
//! # Example
//!
//! ```ignore
//! use crawler::project::open_project;
//! use crawler::storage::FsStorage;
//!
//! let storage = FsStorage::new();
//! let mut loaded = open_project(&storage, "./my-game")?;
//! loaded
//!     .index
//!     .move_behavior_to_family(&storage, "Enemies", &["Bat", "Slime"], "Solid")?;
//! ```

mod assets;
mod index;
mod manifest;
mod migration;
mod record;
mod sid;
mod walker;

pub use assets::{
    frame_path, image_path, read_dimensions, resolve_assets, ResolvedAssets, ResolvedFrame,
    ResolvedImage, IMAGES_DIR,
};
pub use index::{
    list_layouts, list_templates, open_project, open_project_with, ListedEntry, LoadOptions,
    LoadedProject, ProjectIndex, LAYOUTS_DIR, TEMPLATES_DIR,
};
pub use manifest::{join_folder, FolderDescription, FolderItem, ProjectManifest, MANIFEST_FILENAME};
pub use migration::{Direction, MigrationReport};
pub use record::{serialize_document, BehaviorRef, EntityKind, EntityRecord, RecordContent};
pub use sid::{SidGenerator, SID_UPPER_BOUND};
pub use walker::{
    definition_path, namespaced_path, LoadObserver, LoadProgress, NoProgress, TreeWalker,
};
