//! Client-side session state.
//!
//! After a successful create (step 4 refreshes the profile) the session is
//! written to disk; a session-invalidation failure clears it ("logout").
//! Writes are atomic via temp file + rename.

use appdeck_runtime::users::UserProfile;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is corrupt: {0}")]
    Corrupt(String),
}

/// Persisted session: which server, which key, and the last-known profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub server: String,
    pub api_key: String,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn new(server: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            api_key: api_key.into(),
            user: None,
        }
    }

    /// Load a session from disk. A missing file is not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, SessionError> {
        let data = match std::fs::read(path.as_ref()) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session =
            serde_json::from_slice(&data).map_err(|e| SessionError::Corrupt(e.to_string()))?;
        Ok(Some(session))
    }

    /// Write the session to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| SessionError::Corrupt(e.to_string()))?;
        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, data)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Remove the session file (logout). A missing file is not an error.
    pub fn clear(path: impl AsRef<Path>) -> Result<(), SessionError> {
        match std::fs::remove_file(path.as_ref()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
