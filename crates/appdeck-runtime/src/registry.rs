//! Application configuration records, keyed by identifier.
//!
//! The registry is the source of truth for which applications exist and who
//! owns them. Creation conflicts on an existing identifier; deletion is the
//! compensation target of the create workflow.

use crate::persistence::{StateStore, StoreError};
use appdeck_core::validate::{validate_identifier, FieldError};
use appdeck_core::AppConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Errors from registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("application not found: {0}")]
    NotFound(String),
    #[error("application already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] FieldError),
}

/// One stored application: its configuration plus ownership metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecord {
    pub config: AppConfig,
    /// Username of the creating user.
    pub owner: String,
    pub created_at_ms: i64,
}

/// All application records in the system.
pub struct AppRegistry {
    apps: HashMap<String, AppRecord>,
    /// Optional persistent state store
    store: Option<Arc<dyn StateStore>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self {
            apps: HashMap::new(),
            store: None,
        }
    }

    /// Create a registry backed by a state store.
    pub fn with_store(store: Arc<dyn StateStore>) -> Self {
        Self {
            apps: HashMap::new(),
            store: Some(store),
        }
    }

    /// Create a new application record. The identifier must validate and
    /// must not already exist.
    pub fn create_app(&mut self, config: AppConfig, owner: &str) -> Result<(), RegistryError> {
        validate_identifier(&config.id)?;
        if self.apps.contains_key(&config.id) {
            return Err(RegistryError::AlreadyExists(config.id));
        }

        let id = config.id.clone();
        let record = AppRecord {
            config,
            owner: owner.to_string(),
            created_at_ms: chrono::Utc::now().timestamp_millis(),
        };
        self.apps.insert(id.clone(), record);
        self.persist_if_needed(&id);
        Ok(())
    }

    pub fn get_app(&self, id: &str) -> Option<&AppRecord> {
        self.apps.get(id)
    }

    /// Remove an application record.
    pub fn delete_app(&mut self, id: &str) -> Result<AppRecord, RegistryError> {
        let record = self
            .apps
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        if let Some(ref store) = self.store {
            if let Err(e) = store.delete(&format!("app:{id}")) {
                warn!("Failed to delete persisted record for {}: {}", id, e);
            }
        }
        Ok(record)
    }

    /// Identifiers of all applications owned by a user, sorted.
    pub fn apps_owned_by(&self, owner: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .apps
            .values()
            .filter(|r| r.owner == owner)
            .map(|r| r.config.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn list_apps(&self) -> Vec<&AppRecord> {
        self.apps.values().collect()
    }

    pub fn app_count(&self) -> usize {
        self.apps.len()
    }

    /// Persist one record to the store (if configured).
    pub fn persist_if_needed(&self, id: &str) {
        let Some(ref store) = self.store else {
            return;
        };
        let Some(record) = self.apps.get(id) else {
            return;
        };
        if let Err(e) = Self::persist_record(store.as_ref(), record) {
            warn!("Failed to persist application {}: {}", id, e);
        }
    }

    fn persist_record(store: &dyn StateStore, record: &AppRecord) -> Result<(), StoreError> {
        let data = serde_json::to_vec(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        store.put(&format!("app:{}", record.config.id), &data)?;
        store.flush()
    }

    /// Recover all records from the state store.
    ///
    /// Returns the number of applications successfully recovered.
    pub fn recover(&mut self) -> Result<usize, StoreError> {
        let store = match &self.store {
            Some(s) => Arc::clone(s),
            None => return Ok(0),
        };

        let mut recovered = 0;
        let mut failed = 0;
        for key in store.list("app:")? {
            let Some(data) = store.get(&key)? else {
                continue;
            };
            match serde_json::from_slice::<AppRecord>(&data) {
                Ok(record) => {
                    self.apps.insert(record.config.id.clone(), record);
                    recovered += 1;
                }
                Err(e) => {
                    warn!("Failed to deserialize record {}: {}", key, e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            warn!("Recovery complete: {} recovered, {} failed", recovered, failed);
        }
        Ok(recovered)
    }
}

impl Default for AppRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe registry for use in async server context.
pub type SharedAppRegistry = Arc<RwLock<AppRegistry>>;

/// Create a new shared registry.
pub fn shared_registry() -> SharedAppRegistry {
    Arc::new(RwLock::new(AppRegistry::new()))
}

/// Create a shared registry backed by a state store, recovering any
/// persisted records.
pub fn shared_registry_with_store(store: Arc<dyn StateStore>) -> SharedAppRegistry {
    let mut registry = AppRegistry::with_store(store);
    match registry.recover() {
        Ok(count) if count > 0 => {
            info!("Recovered {} application(s) from persistent state", count);
        }
        Ok(_) => {
            info!("No persisted application state found, starting fresh");
        }
        Err(e) => {
            error!("Failed to recover application state: {}", e);
        }
    }
    Arc::new(RwLock::new(registry))
}
