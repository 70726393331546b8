//! Tool configuration (`crawler.yaml`).
//!
//! Optional. Looked up in the project root unless a path is given
//! explicitly; every field has a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CrawlerError, Result};
use crate::project::{LoadOptions, MANIFEST_FILENAME};
use crate::storage::Storage;

/// The name of the configuration file.
pub const CONFIG_FILENAME: &str = "crawler.yaml";

/// Default log file name, relative to the project root.
pub const DEFAULT_LOG_FILE: &str = "crawler-log.txt";

/// Tool configuration loaded from crawler.yaml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Manifest file name inside the project directory.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Where the diagnostic log is written. Relative paths are resolved
    /// against the project root.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Read image headers to record sizes of resolved assets.
    #[serde(default)]
    pub read_image_dimensions: bool,

    /// Load definitions of one folder level in parallel.
    #[serde(default = "default_parallel")]
    pub parallel_loads: bool,
}

fn default_manifest() -> String {
    MANIFEST_FILENAME.to_string()
}

fn default_parallel() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            log_file: None,
            read_image_dimensions: false,
            parallel_loads: default_parallel(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(storage: &dyn Storage, path: &Path) -> Result<Self> {
        let content = storage.read_text(path).map_err(|e| CrawlerError::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
            help: None,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| CrawlerError::Config {
            message: format!("Invalid configuration: {}", e),
            help: Some(format!("Check {} syntax", CONFIG_FILENAME)),
        })
    }

    /// Use `explicit` if given, else `<project>/crawler.yaml` if present,
    /// else defaults.
    pub fn discover(storage: &dyn Storage, project: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(storage, path);
        }

        let path = project.join(CONFIG_FILENAME);
        if storage.exists(&path) {
            Self::load(storage, &path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loader options derived from this configuration.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            manifest: self.manifest.clone(),
            read_image_dimensions: self.read_image_dimensions,
            parallel: self.parallel_loads,
        }
    }

    /// Path the diagnostic log is dumped to for a project at `root`.
    pub fn log_path(&self, root: &Path) -> PathBuf {
        match &self.log_file {
            Some(path) => root.join(path),
            None => root.join(DEFAULT_LOG_FILE),
        }
    }
}
