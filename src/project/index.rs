//! Project index assembly.
//!
//! Opening a project reads the manifest, walks object types and families,
//! lists layouts and templates, and resolves images. Only a missing or broken manifest
//! fails the open; every per-item problem becomes a diagnostic and the
//! best-effort index is still returned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::diagnostics::{codes, DiagnosticLog};
use crate::error::Result;
use crate::storage::Storage;

use super::assets::resolve_assets;
use super::manifest::{FolderDescription, ProjectManifest, MANIFEST_FILENAME};
use super::record::{EntityKind, EntityRecord};
use super::walker::{namespaced_path, LoadObserver, NoProgress, TreeWalker};

/// Directory under the project root holding layouts.
pub const LAYOUTS_DIR: &str = "layouts";

/// Directory under the project root holding templates.
pub const TEMPLATES_DIR: &str = "templates";

/// Options for opening a project.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Manifest file name inside the project directory.
    pub manifest: String,
    /// Read PNG headers of resolved images to record their size.
    pub read_image_dimensions: bool,
    /// Load the items of a folder level in parallel.
    pub parallel: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            manifest: MANIFEST_FILENAME.to_string(),
            read_image_dimensions: false,
            parallel: true,
        }
    }
}

/// A layout or template listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub name: String,
    pub folder: String,
    pub path: PathBuf,
}

/// Name-indexed, discovery-ordered view of a loaded project.
#[derive(Debug, Clone)]
pub struct ProjectIndex {
    root: PathBuf,
    name: String,
    manifest: ProjectManifest,
    pub(crate) object_types: Vec<EntityRecord>,
    object_types_by_name: HashMap<String, usize>,
    pub(crate) families: Vec<EntityRecord>,
    families_by_name: HashMap<String, usize>,
    layouts: Vec<ListedEntry>,
    templates: Vec<ListedEntry>,
}

impl ProjectIndex {
    /// Assemble an index from already-loaded records.
    ///
    /// When a name repeats, lookups return the later record.
    pub fn from_records(
        root: impl Into<PathBuf>,
        manifest: ProjectManifest,
        object_types: Vec<EntityRecord>,
        families: Vec<EntityRecord>,
        layouts: Vec<ListedEntry>,
    ) -> Self {
        Self {
            root: root.into(),
            name: manifest.name.clone(),
            manifest,
            object_types_by_name: name_map(&object_types),
            object_types,
            families_by_name: name_map(&families),
            families,
            layouts,
            templates: Vec::new(),
        }
    }

    /// Attach the template listing.
    pub fn with_templates(mut self, templates: Vec<ListedEntry>) -> Self {
        self.templates = templates;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest(&self) -> &ProjectManifest {
        &self.manifest
    }

    pub fn object_type(&self, name: &str) -> Option<&EntityRecord> {
        self.get(EntityKind::ObjectType, name)
    }

    pub fn family(&self, name: &str) -> Option<&EntityRecord> {
        self.get(EntityKind::Family, name)
    }

    /// Object types in discovery order.
    pub fn object_types(&self) -> &[EntityRecord] {
        &self.object_types
    }

    /// Families in discovery order.
    pub fn families(&self) -> &[EntityRecord] {
        &self.families
    }

    /// Object types whose definition loaded successfully.
    pub fn loaded_object_types(&self) -> impl Iterator<Item = &EntityRecord> {
        self.object_types.iter().filter(|r| r.is_loaded())
    }

    pub fn layouts(&self) -> &[ListedEntry] {
        &self.layouts
    }

    pub fn templates(&self) -> &[ListedEntry] {
        &self.templates
    }

    /// Records that failed to load, across both namespaces.
    pub fn failed_records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.object_types
            .iter()
            .chain(&self.families)
            .filter(|r| !r.is_loaded())
    }

    pub fn get(&self, kind: EntityKind, name: &str) -> Option<&EntityRecord> {
        self.position(kind, name).map(|i| &self.records(kind)[i])
    }

    pub(crate) fn position(&self, kind: EntityKind, name: &str) -> Option<usize> {
        match kind {
            EntityKind::ObjectType => self.object_types_by_name.get(name).copied(),
            EntityKind::Family => self.families_by_name.get(name).copied(),
        }
    }

    pub(crate) fn records(&self, kind: EntityKind) -> &[EntityRecord] {
        match kind {
            EntityKind::ObjectType => &self.object_types,
            EntityKind::Family => &self.families,
        }
    }

    pub(crate) fn records_mut(&mut self, kind: EntityKind) -> &mut [EntityRecord] {
        match kind {
            EntityKind::ObjectType => &mut self.object_types,
            EntityKind::Family => &mut self.families,
        }
    }
}

fn name_map(records: &[EntityRecord]) -> HashMap<String, usize> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.name.clone(), i))
        .collect()
}

/// An opened project plus everything logged while opening it.
#[derive(Debug)]
pub struct LoadedProject {
    pub index: ProjectIndex,
    pub diagnostics: DiagnosticLog,
}

/// Open the project at `root` with default options and no progress reporting.
pub fn open_project(storage: &dyn Storage, root: impl AsRef<Path>) -> Result<LoadedProject> {
    open_project_with(storage, root, &LoadOptions::default(), &NoProgress)
}

/// Open the project at `root`.
pub fn open_project_with(
    storage: &dyn Storage,
    root: impl AsRef<Path>,
    options: &LoadOptions,
    observer: &dyn LoadObserver,
) -> Result<LoadedProject> {
    let root = root.as_ref();
    let manifest = ProjectManifest::load(storage, &root.join(&options.manifest))?;
    let mut log = DiagnosticLog::new();

    let mut object_types = TreeWalker::new(storage, root, EntityKind::ObjectType)
        .parallel(options.parallel)
        .observer(observer)
        .walk(&manifest.object_types, &mut log);

    for record in object_types.iter_mut().filter(|r| r.is_loaded()) {
        resolve_assets(storage, root, record, options.read_image_dimensions, &mut log);
    }

    let families = TreeWalker::new(storage, root, EntityKind::Family)
        .parallel(options.parallel)
        .observer(observer)
        .walk(&manifest.families, &mut log);

    let layouts = list_layouts(storage, root, &manifest.layouts, &mut log);
    let templates = list_templates(storage, root, &manifest.templates, &mut log);

    log.info(
        codes::PROJECT_OPENED,
        format!("Project {} opened.", manifest.name),
    );

    Ok(LoadedProject {
        index: ProjectIndex::from_records(root, manifest, object_types, families, layouts)
            .with_templates(templates),
        diagnostics: log,
    })
}

/// List layouts in manifest order. Missing layout files are only a warning.
pub fn list_layouts(
    storage: &dyn Storage,
    root: &Path,
    folder: &FolderDescription,
    log: &mut DiagnosticLog,
) -> Vec<ListedEntry> {
    list_files(storage, root, LAYOUTS_DIR, "layout", codes::LAYOUT_MISSING, folder, log)
}

/// List templates in manifest order. Missing template files are only a warning.
pub fn list_templates(
    storage: &dyn Storage,
    root: &Path,
    folder: &FolderDescription,
    log: &mut DiagnosticLog,
) -> Vec<ListedEntry> {
    list_files(storage, root, TEMPLATES_DIR, "template", codes::TEMPLATE_MISSING, folder, log)
}

fn list_files(
    storage: &dyn Storage,
    root: &Path,
    namespace: &str,
    label: &str,
    code: &str,
    folder: &FolderDescription,
    log: &mut DiagnosticLog,
) -> Vec<ListedEntry> {
    folder
        .flatten()
        .into_iter()
        .map(|item| {
            let path = namespaced_path(root, namespace, &item.folder, &item.name);
            if !storage.exists(&path) {
                log.warning(
                    code,
                    format!("No {} file found for {} in {}", label, item.name, item.folder),
                );
            }
            ListedEntry {
                name: item.name,
                folder: item.folder,
                path,
            }
        })
        .collect()
}
