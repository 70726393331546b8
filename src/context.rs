//! Application context owning the open project.
//!
//! There is no process-wide project state: the context owns at most one
//! [`ProjectIndex`] and replaces it wholesale on every open or close.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::diagnostics::DiagnosticLog;
use crate::error::{CrawlerError, Result};
use crate::project::{
    open_project_with, Direction, LoadObserver, MigrationReport, NoProgress, ProjectIndex,
};
use crate::storage::Storage;

/// Owns storage, configuration, the open project and its diagnostics.
pub struct AppContext<S: Storage> {
    storage: S,
    config: Config,
    project: Option<ProjectIndex>,
    diagnostics: DiagnosticLog,
}

impl<S: Storage> AppContext<S> {
    pub fn new(storage: S, config: Config) -> Self {
        Self {
            storage,
            config,
            project: None,
            diagnostics: DiagnosticLog::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> Option<&ProjectIndex> {
        self.project.as_ref()
    }

    pub fn index_mut(&mut self) -> Option<&mut ProjectIndex> {
        self.project.as_mut()
    }

    /// Diagnostics collected by the last open.
    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Open the project at `root`, replacing any open project.
    pub fn open(&mut self, root: impl AsRef<Path>) -> Result<&ProjectIndex> {
        self.open_with(root, &NoProgress)
    }

    pub fn open_with(
        &mut self,
        root: impl AsRef<Path>,
        observer: &dyn LoadObserver,
    ) -> Result<&ProjectIndex> {
        self.project = None;
        self.diagnostics = DiagnosticLog::new();

        let loaded = open_project_with(
            &self.storage,
            root,
            &self.config.load_options(),
            observer,
        )?;
        self.diagnostics = loaded.diagnostics;
        Ok(self.project.insert(loaded.index))
    }

    /// Close the open project, returning it.
    pub fn close(&mut self) -> Option<ProjectIndex> {
        self.diagnostics = DiagnosticLog::new();
        self.project.take()
    }

    /// Reload the open project from disk. Returns `None` if nothing is open.
    pub fn reopen(&mut self) -> Result<Option<&ProjectIndex>> {
        let Some(root) = self.project.as_ref().map(|p| p.root().to_path_buf()) else {
            return Ok(None);
        };
        self.open(root).map(Some)
    }

    /// Move a behavior between a family and its members.
    ///
    /// With `members` unset, the family's own `members` list is used.
    pub fn migrate(
        &mut self,
        direction: Direction,
        family: &str,
        members: Option<&[String]>,
        behavior: &str,
    ) -> Result<MigrationReport> {
        let index = self
            .project
            .as_mut()
            .ok_or_else(|| CrawlerError::precondition("no project is open"))?;

        let members: Vec<String> = match members {
            Some(members) => members.to_vec(),
            None => index
                .family(family)
                .map(|f| f.family_members())
                .unwrap_or_default(),
        };
        let members: Vec<&str> = members.iter().map(String::as_str).collect();

        index.migrate_behavior(&self.storage, direction, family, &members, behavior)
    }

    /// Write the diagnostic log next to the project if it is non-empty.
    pub fn dump_log(&self) -> Result<Option<PathBuf>> {
        let Some(project) = &self.project else {
            return Ok(None);
        };
        let path = self.config.log_path(project.root());
        if self.diagnostics.export(&self.storage, &path)? {
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}
