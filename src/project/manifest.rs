//! Project manifest (`project.c3proj`) parsing.
//!
//! The manifest carries the author-defined folder hierarchy for object
//! types, families, layouts and templates. Only the parts the loader needs are
//! modelled; everything else in the file is ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CrawlerError, Result};
use crate::storage::Storage;

/// Default manifest file name inside a project directory.
pub const MANIFEST_FILENAME: &str = "project.c3proj";

/// A folder of named items plus nested subfolders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderDescription {
    pub name: String,
    pub items: Vec<String>,
    pub subfolders: Vec<FolderDescription>,
}

/// One item reached by walking a [`FolderDescription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderItem {
    /// Subfolder names from the root, joined with `/` ("" at the root).
    pub folder: String,
    pub name: String,
}

impl FolderDescription {
    /// Build a folder with items and no subfolders.
    pub fn with_items(name: impl Into<String>, items: &[&str]) -> Self {
        Self {
            name: name.into(),
            items: items.iter().map(|s| s.to_string()).collect(),
            subfolders: vec![],
        }
    }

    /// Add a subfolder (builder style).
    pub fn with_subfolder(mut self, subfolder: FolderDescription) -> Self {
        self.subfolders.push(subfolder);
        self
    }

    /// Total number of items, including nested subfolders.
    pub fn total_items(&self) -> usize {
        self.items.len()
            + self
                .subfolders
                .iter()
                .map(FolderDescription::total_items)
                .sum::<usize>()
    }

    /// Every item in pre-order: a folder's own items before its subfolders,
    /// subfolders in listed order.
    pub fn flatten(&self) -> Vec<FolderItem> {
        let mut out = Vec::with_capacity(self.total_items());
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, folder: &str, out: &mut Vec<FolderItem>) {
        out.extend(self.items.iter().map(|name| FolderItem {
            folder: folder.to_string(),
            name: name.clone(),
        }));
        for sub in &self.subfolders {
            sub.flatten_into(&join_folder(folder, &sub.name), out);
        }
    }
}

/// Join a parent folder path and a child folder name with `/`.
pub fn join_folder(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{}/{}", parent, child)
    }
}

/// The parts of `project.c3proj` the loader consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectManifest {
    pub name: String,
    pub object_types: FolderDescription,
    pub families: FolderDescription,
    pub layouts: FolderDescription,
    pub templates: FolderDescription,
}

impl ProjectManifest {
    /// Load the manifest through `storage`.
    pub fn load(storage: &dyn Storage, path: &Path) -> Result<Self> {
        let content = storage.read_text(path)?;
        Self::parse(&content).map_err(|e| match e {
            CrawlerError::Parse { message, help, .. } => CrawlerError::Parse {
                path: path.to_path_buf(),
                message,
                help,
            },
            other => other,
        })
    }

    /// Parse manifest JSON.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| CrawlerError::Parse {
            path: MANIFEST_FILENAME.into(),
            message: format!("Invalid manifest: {}", e),
            help: Some("Check that the project was saved as a folder project".to_string()),
        })
    }
}
