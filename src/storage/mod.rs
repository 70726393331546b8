//! Storage gateway used by the loader and the migration engine.
//!
//! Everything the core touches on disk goes through [`Storage`], so the
//! same code runs against the real filesystem ([`FsStorage`]) and against
//! an in-memory tree ([`MemoryStorage`]) in tests and benches.

mod fs;
mod memory;

use std::path::Path;

use crate::error::Result;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

/// Options for directory creation and removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirOptions {
    /// Create missing parents / remove contents.
    pub recursive: bool,
}

impl DirOptions {
    pub fn recursive() -> Self {
        Self { recursive: true }
    }
}

/// Byte and text I/O capabilities consumed by the core.
///
/// Implementations must be shareable across threads: item loads within a
/// folder level and the writes of a persist batch are fanned out in
/// parallel.
pub trait Storage: Send + Sync {
    /// Check whether a file or directory exists.
    fn exists(&self, path: &Path) -> bool;

    /// Read a UTF-8 file. Fails with `CrawlerError::NotFound` when absent.
    fn read_text(&self, path: &Path) -> Result<String>;

    /// Create or overwrite a UTF-8 file.
    fn write_text(&self, path: &Path, content: &str) -> Result<()>;

    /// Read a file as raw bytes.
    fn read_binary(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create or overwrite a file with raw bytes.
    fn write_binary(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    fn create_dir(&self, path: &Path, options: DirOptions) -> Result<()>;

    fn remove_dir(&self, path: &Path, options: DirOptions) -> Result<()>;
}
