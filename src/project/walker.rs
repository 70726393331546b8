//! Tree walker: turns a manifest folder hierarchy into entity records.
//!
//! Every item of a [`FolderDescription`] maps to
//! `<root>/<namespace>/<folder path>/<name>.json`. Items are visited in
//! pre-order with a folder's own items before its subfolders. A missing
//! or malformed file never stops the walk; it yields an unloaded record
//! and an error diagnostic.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::diagnostics::{codes, Diagnostic, DiagnosticLog};
use crate::storage::Storage;

use super::manifest::{join_folder, FolderDescription};
use super::record::{EntityKind, EntityRecord, RecordContent};

/// A progress update emitted after each item is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress<'a> {
    pub kind: EntityKind,
    /// Folder currently being loaded ("" at the root).
    pub folder: &'a str,
    pub current: usize,
    pub total: usize,
}

/// Receives loading progress.
pub trait LoadObserver {
    fn progress(&self, _update: &LoadProgress<'_>) {}
}

/// Observer that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl LoadObserver for NoProgress {}

/// Path of a definition file for `name` in `folder`.
pub fn definition_path(root: &Path, kind: EntityKind, folder: &str, name: &str) -> PathBuf {
    namespaced_path(root, kind.dir_name(), folder, name)
}

/// `<root>/<namespace>/<folder>/<name>.json`, splitting `folder` on `/`.
pub fn namespaced_path(root: &Path, namespace: &str, folder: &str, name: &str) -> PathBuf {
    let mut path = root.join(namespace);
    for segment in folder.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.join(format!("{}.json", name))
}

/// Walks one namespace of a project.
pub struct TreeWalker<'a> {
    storage: &'a dyn Storage,
    root: &'a Path,
    kind: EntityKind,
    parallel: bool,
    observer: &'a dyn LoadObserver,
}

impl<'a> TreeWalker<'a> {
    pub fn new(storage: &'a dyn Storage, root: &'a Path, kind: EntityKind) -> Self {
        Self {
            storage,
            root,
            kind,
            parallel: true,
            observer: &NoProgress,
        }
    }

    /// Load the items of one folder level in parallel (default) or one by one.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn observer(mut self, observer: &'a dyn LoadObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Walk `folder` and return one record per item, in discovery order.
    pub fn walk(&self, folder: &FolderDescription, log: &mut DiagnosticLog) -> Vec<EntityRecord> {
        let total = folder.total_items();
        let mut records = Vec::with_capacity(total);
        self.walk_level(folder, "", total, &mut records, log);
        records
    }

    fn walk_level(
        &self,
        folder: &FolderDescription,
        path: &str,
        total: usize,
        records: &mut Vec<EntityRecord>,
        log: &mut DiagnosticLog,
    ) {
        log.info(
            codes::LOAD_FOLDER,
            format!("Adding {} entries in {}", self.kind, path),
        );

        let (storage, root, kind) = (self.storage, self.root, self.kind);
        let loaded: Vec<(EntityRecord, DiagnosticLog)> = if self.parallel {
            folder
                .items
                .par_iter()
                .map(|name| load_definition(storage, root, kind, path, name))
                .collect()
        } else {
            folder
                .items
                .iter()
                .map(|name| load_definition(storage, root, kind, path, name))
                .collect()
        };

        for (record, item_log) in loaded {
            log.extend(item_log);
            records.push(record);
            self.observer.progress(&LoadProgress {
                kind: self.kind,
                folder: path,
                current: records.len(),
                total,
            });
        }

        for sub in &folder.subfolders {
            self.walk_level(sub, &join_folder(path, &sub.name), total, records, log);
        }
    }
}

/// Load one definition. The raw text and the document come from a single read.
fn load_definition(
    storage: &dyn Storage,
    root: &Path,
    kind: EntityKind,
    folder: &str,
    name: &str,
) -> (EntityRecord, DiagnosticLog) {
    let mut log = DiagnosticLog::new();
    let src = definition_path(root, kind, folder, name);
    log.info(
        codes::LOAD_ITEM,
        format!("Getting info for {} in {}", name, folder),
    );

    let raw = match storage.read_text(&src) {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => {
            log.error(
                codes::LOAD_MISSING,
                format!("No {} file found for {} in {}", kind, name, folder),
            );
            return (EntityRecord::unloaded(name, kind, folder, src), log);
        }
        Err(e) => {
            log.error(
                codes::LOAD_READ,
                format!("Could not read {} {}: {}", kind, name, e),
            );
            return (EntityRecord::unloaded(name, kind, folder, src), log);
        }
    };

    match RecordContent::parse(raw) {
        Ok(content) => (EntityRecord::loaded(name, kind, folder, src, content), log),
        Err(e) => {
            log.push(
                Diagnostic::error(
                    codes::LOAD_PARSE,
                    format!("Malformed {} file {}: {}", kind, src.display(), e),
                )
                .with_help("Fix the JSON and reopen the project"),
            );
            (EntityRecord::unloaded(name, kind, folder, src), log)
        }
    }
}
