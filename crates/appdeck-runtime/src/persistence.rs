//! Pluggable key-value persistence for service state.
//!
//! The registry persists one record per key; keys use `:` separators which
//! the file-backed store maps to subdirectories. Writes are atomic via temp
//! file + rename.

use std::collections::HashMap;
use std::path::PathBuf;

/// Error type for state store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Trait for state storage backends.
pub trait StateStore: Send + Sync {
    /// Store arbitrary key-value data.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve arbitrary key-value data.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// List all keys under a `prefix:`.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Flush all pending writes to disk.
    fn flush(&self) -> Result<(), StoreError>;
}

/// In-memory state store for testing.
#[derive(Default)]
pub struct MemoryStore {
    data: std::sync::RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(|e| StoreError::Io(e.to_string()))?;
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let data = self.data.read().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(|e| StoreError::Io(e.to_string()))?;
        data.remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let data = self.data.read().map_err(|e| StoreError::Io(e.to_string()))?;
        let mut keys: Vec<String> = data
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(()) // No-op for memory store
    }
}

/// File-system based state store.
///
/// Stores key-value pairs as files in a directory. Keys containing ":"
/// are mapped to subdirectories (e.g., "app:demo" → "app/demo").
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open or create a file-based store at the given directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self { dir })
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let path_str = key.replace(':', std::path::MAIN_SEPARATOR_STR);
        self.dir.join(path_str)
    }
}

impl StateStore for FileStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.key_to_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        // Atomic write: write to temp file, then rename
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, value).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(self.key_to_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.key_to_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let prefix_dir = self.key_to_path(prefix.trim_end_matches(':'));
        if !prefix_dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let entries =
            std::fs::read_dir(&prefix_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io(e.to_string()))?;
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(".tmp") {
                    keys.push(format!("{}{}", prefix, name));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(()) // File writes are already flushed on close
    }
}
