//! User accounts for the apps service.
//!
//! Authentication is by api key; a user's profile lists the identifiers of
//! the applications they own, recomputed from the registry at refresh time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Errors from user store operations.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user already exists: {0}")]
    AlreadyExists(String),
    #[error("api key already in use")]
    KeyInUse,
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub api_key: String,
}

/// What a client sees after a session refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    /// Identifiers of the applications this user owns, sorted.
    pub apps: Vec<String>,
}

/// All accounts in the system.
#[derive(Default)]
pub struct UserStore {
    accounts: HashMap<String, UserAccount>,
    /// api key → username lookup
    api_key_index: HashMap<String, String>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new account.
    pub fn register(&mut self, username: &str, api_key: &str) -> Result<(), UserError> {
        if self.accounts.contains_key(username) {
            return Err(UserError::AlreadyExists(username.to_string()));
        }
        if self.api_key_index.contains_key(api_key) {
            return Err(UserError::KeyInUse);
        }

        self.accounts.insert(
            username.to_string(),
            UserAccount {
                username: username.to_string(),
                api_key: api_key.to_string(),
            },
        );
        self.api_key_index
            .insert(api_key.to_string(), username.to_string());
        Ok(())
    }

    /// Resolve an api key to its account.
    pub fn by_api_key(&self, api_key: &str) -> Option<&UserAccount> {
        self.api_key_index
            .get(api_key)
            .and_then(|username| self.accounts.get(username))
    }

    pub fn user_count(&self) -> usize {
        self.accounts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut store = UserStore::new();
        store.register("alice", "key-a").unwrap();

        let account = store.by_api_key("key-a").unwrap();
        assert_eq!(account.username, "alice");
        assert!(store.by_api_key("wrong").is_none());
    }

    #[test]
    fn test_register_duplicate_username() {
        let mut store = UserStore::new();
        store.register("alice", "key-a").unwrap();
        assert!(matches!(
            store.register("alice", "key-b"),
            Err(UserError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_register_duplicate_key() {
        let mut store = UserStore::new();
        store.register("alice", "key-a").unwrap();
        assert!(matches!(
            store.register("bob", "key-a"),
            Err(UserError::KeyInUse)
        ));
        assert_eq!(store.user_count(), 1);
    }
}
