//! Key-value storage shared by the converter and the widget.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use kurs_common::{KursError, KursResult};
use tempfile::NamedTempFile;
use tracing::debug;

/// A small key-value region readable by another process.
pub trait SnapshotStore: Send + Sync {
    /// Read the value stored under `key`.
    fn read(&self, key: &str) -> KursResult<Option<Vec<u8>>>;

    /// Replace the value stored under `key`.
    fn write(&self, key: &str, value: &[u8]) -> KursResult<()>;
}

/// In-process store, used in tests and when no shared directory is configured.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self, key: &str) -> KursResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn write(&self, key: &str, value: &[u8]) -> KursResult<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// One file per key inside a shared directory.
///
/// Writes go to a uniquely named temporary file in the same directory and
/// are renamed into place, so a reader sees either the old or the new payload.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Open a store in `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> KursResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the payload files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> KursResult<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(KursError::Storage(format!("invalid snapshot key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn read(&self, key: &str) -> KursResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> KursResult<()> {
        let path = self.path_for(key)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value)?;
        tmp.persist(&path).map_err(|e| KursError::from(e.error))?;

        debug!(key, bytes = value.len(), path = %path.display(), "Wrote snapshot payload");
        Ok(())
    }
}
