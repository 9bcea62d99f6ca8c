//! Server-side state for the appdeck apps service.
//!
//! - [`registry`]: application configuration records, keyed by identifier
//! - [`storage`]: per-application file storage for uploaded model assets
//! - [`users`]: api-key-authenticated user accounts and profiles
//! - [`persistence`]: pluggable key-value state stores for registry recovery

pub mod persistence;
pub mod registry;
pub mod storage;
pub mod users;

pub use persistence::{FileStore, MemoryStore, StateStore, StoreError};
pub use registry::{
    shared_registry, shared_registry_with_store, AppRecord, AppRegistry, RegistryError,
    SharedAppRegistry,
};
pub use storage::{AppStorage, StorageError};
pub use users::{UserAccount, UserError, UserProfile, UserStore};
