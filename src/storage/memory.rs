//! In-memory storage for tests and benchmarks.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{CrawlerError, Result};

use super::{DirOptions, Storage};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
    failing_writes: HashSet<PathBuf>,
    read_delays: HashMap<PathBuf, Duration>,
    journal: Vec<PathBuf>,
}

/// A [`Storage`] that keeps every file in a map.
///
/// Supports injected write failures and per-file read latency, which
/// lets tests scramble I/O completion order.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a text file, creating its parent directories.
    pub fn insert(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.insert_binary(path, content.into().into_bytes());
    }

    /// Insert a binary file, creating its parent directories.
    pub fn insert_binary(&self, path: impl AsRef<Path>, bytes: Vec<u8>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        add_parents(&mut state.dirs, &path);
        state.files.insert(path, bytes);
    }

    /// Make every subsequent write to `path` fail.
    pub fn fail_writes_to(&self, path: impl AsRef<Path>) {
        self.lock().failing_writes.insert(path.as_ref().to_path_buf());
    }

    /// Delay reads of `path` by `delay`.
    pub fn delay_reads_of(&self, path: impl AsRef<Path>, delay: Duration) {
        self.lock()
            .read_delays
            .insert(path.as_ref().to_path_buf(), delay);
    }

    /// Text content of `path`, if present and valid UTF-8.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock()
            .files
            .get(path.as_ref())
            .and_then(|bytes| String::from_utf8(bytes.clone()).ok())
    }

    /// Paths written so far, in completion order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.lock().journal.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let delay = self.lock().read_delays.get(path).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| CrawlerError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn write(&self, path: &Path, bytes: Vec<u8>) -> Result<()> {
        let mut state = self.lock();
        if state.failing_writes.contains(path) {
            return Err(CrawlerError::Io {
                path: path.to_path_buf(),
                message: "injected write failure".to_string(),
            });
        }
        add_parents(&mut state.dirs, path);
        state.files.insert(path.to_path_buf(), bytes);
        state.journal.push(path.to_path_buf());
        Ok(())
    }
}

fn add_parents(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        dirs.insert(ancestor.to_path_buf());
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| CrawlerError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<()> {
        self.write(path, content.as_bytes().to_vec())
    }

    fn read_binary(&self, path: &Path) -> Result<Vec<u8>> {
        self.read(path)
    }

    fn write_binary(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.write(path, bytes.to_vec())
    }

    fn create_dir(&self, path: &Path, options: DirOptions) -> Result<()> {
        let mut state = self.lock();
        if !options.recursive {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !state.dirs.contains(parent) {
                    return Err(CrawlerError::NotFound {
                        path: parent.to_path_buf(),
                    });
                }
            }
        } else {
            add_parents(&mut state.dirs, path);
        }
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_dir(&self, path: &Path, options: DirOptions) -> Result<()> {
        let mut state = self.lock();
        if !state.dirs.contains(path) {
            return Err(CrawlerError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let has_children = state.files.keys().any(|p| p.starts_with(path))
            || state.dirs.iter().any(|d| d != path && d.starts_with(path));
        if has_children && !options.recursive {
            return Err(CrawlerError::Io {
                path: path.to_path_buf(),
                message: "directory not empty".to_string(),
            });
        }

        state.files.retain(|p, _| !p.starts_with(path));
        state.dirs.retain(|d| !d.starts_with(path));
        Ok(())
    }
}
