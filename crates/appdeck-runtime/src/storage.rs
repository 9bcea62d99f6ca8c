//! Per-application file storage.
//!
//! Each application owns one directory under the storage root, holding its
//! generated application files plus an uploaded model under `model/`.
//! Identifiers are validated before any path is formed, so storage paths
//! cannot escape the root.

use appdeck_core::validate::validate_identifier;
use appdeck_core::{AppConfig, ModelFile};
use std::path::{Path, PathBuf};

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage directory for \"{0}\" already exists")]
    AlreadyExists(String),
    #[error("no storage directory for \"{0}\"")]
    NotFound(String),
    #[error("identifier not allowed in storage paths: {0}")]
    InvalidIdentifier(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// File storage rooted at a single directory.
pub struct AppStorage {
    root: PathBuf,
}

impl AppStorage {
    /// Open or create storage at the given root directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory for one application. Fails on identifiers that do not
    /// pass validation — those could carry path separators.
    fn app_dir(&self, id: &str) -> Result<PathBuf, StorageError> {
        validate_identifier(id).map_err(|e| StorageError::InvalidIdentifier(e.to_string()))?;
        Ok(self.root.join(id))
    }

    pub fn has_app_dir(&self, id: &str) -> bool {
        self.app_dir(id).map(|d| d.is_dir()).unwrap_or(false)
    }

    /// Create the application's directory and write its application files.
    /// Fails if the directory already exists.
    pub fn create_app_dir(&self, config: &AppConfig) -> Result<PathBuf, StorageError> {
        let dir = self.app_dir(&config.id)?;
        if dir.exists() {
            return Err(StorageError::AlreadyExists(config.id.clone()));
        }
        std::fs::create_dir_all(&dir)?;

        let app_json = serde_json::to_vec_pretty(config)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        std::fs::write(dir.join("app.json"), app_json)?;
        Ok(dir)
    }

    /// Store the uploaded model files under `<app>/model/`. The application
    /// directory must exist. Returns the number of files written.
    pub fn store_model_files(
        &self,
        id: &str,
        topology: &ModelFile,
        weights: &[ModelFile],
    ) -> Result<usize, StorageError> {
        let dir = self.app_dir(id)?;
        if !dir.is_dir() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        let model_dir = dir.join("model");
        std::fs::create_dir_all(&model_dir)?;

        std::fs::write(model_dir.join(&topology.name), &topology.data)?;
        for weight in weights {
            std::fs::write(model_dir.join(&weight.name), &weight.data)?;
        }
        Ok(1 + weights.len())
    }

    /// Remove an application's directory and everything in it. Removing a
    /// missing directory is not an error.
    pub fn remove_app_dir(&self, id: &str) -> Result<(), StorageError> {
        let dir = self.app_dir(id)?;
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(id: &str) -> AppConfig {
        let mut config = AppConfig::draft();
        config.id = id.to_string();
        config
    }

    fn storage() -> (tempfile::TempDir, AppStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = AppStorage::open(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_create_app_dir() {
        let (_guard, storage) = storage();
        let dir = storage.create_app_dir(&config("demo")).unwrap();

        assert!(dir.is_dir());
        assert!(dir.join("app.json").is_file());
        assert!(storage.has_app_dir("demo"));
    }

    #[test]
    fn test_create_app_dir_conflict() {
        let (_guard, storage) = storage();
        storage.create_app_dir(&config("demo")).unwrap();

        let result = storage.create_app_dir(&config("demo"));
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn test_store_model_files() {
        let (_guard, storage) = storage();
        storage.create_app_dir(&config("demo")).unwrap();

        let topology = ModelFile::new("model.json", b"{}".to_vec());
        let weights = vec![ModelFile::new("group1-shard1of1.bin", vec![1, 2, 3])];
        let stored = storage
            .store_model_files("demo", &topology, &weights)
            .unwrap();

        assert_eq!(stored, 2);
        let model_dir = storage.root().join("demo").join("model");
        assert!(model_dir.join("model.json").is_file());
        assert_eq!(
            std::fs::read(model_dir.join("group1-shard1of1.bin")).unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_store_model_files_requires_dir() {
        let (_guard, storage) = storage();
        let topology = ModelFile::new("model.json", b"{}".to_vec());
        let result = storage.store_model_files("missing", &topology, &[]);
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_remove_app_dir() {
        let (_guard, storage) = storage();
        storage.create_app_dir(&config("demo")).unwrap();

        storage.remove_app_dir("demo").unwrap();
        assert!(!storage.has_app_dir("demo"));

        // Removing again is fine
        storage.remove_app_dir("demo").unwrap();
    }

    #[test]
    fn test_rejects_traversal_identifier() {
        let (_guard, storage) = storage();
        let result = storage.create_app_dir(&config("../escape"));
        assert!(matches!(result, Err(StorageError::InvalidIdentifier(_))));
        assert!(!storage.root().parent().unwrap().join("escape").exists());
    }
}
