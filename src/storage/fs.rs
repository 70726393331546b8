//! Filesystem-backed storage.

use std::fs;
use std::path::Path;

use crate::error::{CrawlerError, Result};

use super::{DirOptions, Storage};

/// [`Storage`] over `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| CrawlerError::from_io(path, e))
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content).map_err(|e| CrawlerError::from_io(path, e))
    }

    fn read_binary(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| CrawlerError::from_io(path, e))
    }

    fn write_binary(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).map_err(|e| CrawlerError::from_io(path, e))
    }

    fn create_dir(&self, path: &Path, options: DirOptions) -> Result<()> {
        let result = if options.recursive {
            fs::create_dir_all(path)
        } else {
            fs::create_dir(path)
        };
        result.map_err(|e| CrawlerError::from_io(path, e))
    }

    fn remove_dir(&self, path: &Path, options: DirOptions) -> Result<()> {
        let result = if options.recursive {
            fs::remove_dir_all(path)
        } else {
            fs::remove_dir(path)
        };
        result.map_err(|e| CrawlerError::from_io(path, e))
    }
}
