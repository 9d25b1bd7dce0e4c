//! Credential persistence hooks.
//!
//! The store never persists its access token itself. [`Store::init`] reads
//! it once through a [`CredentialHook`] at startup and writes it once after
//! registering a new account. A hook is a plain string key-value pair; the
//! store always uses [`CREDENTIAL_KEY`].
//!
//! [`Store::init`]: crate::store::Store::init

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::HookError;

/// The identifier the store saves its credential under.
pub const CREDENTIAL_KEY: &str = "telestore.access_token";

/// External load/save of persisted string values.
#[async_trait::async_trait]
pub trait CredentialHook: Send + Sync {
    /// Load the value saved under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] if persisted state cannot be read.
    async fn load(&self, key: &str) -> Result<Option<String>, HookError>;

    /// Save `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] if persisted state cannot be written.
    async fn save(&self, key: &str, value: &str) -> Result<(), HookError>;
}

/// In-memory hook. Cloning shares state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialHook {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryCredentialHook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CredentialHook for MemoryCredentialHook {
    async fn load(&self, key: &str) -> Result<Option<String>, HookError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), HookError> {
        self.values
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Hook backed by a JSON object file (`{"<key>": "<value>", ...}`).
///
/// A missing file reads as empty. Saving creates parent directories and, on
/// Unix, restricts the file to its owner (`0600`).
#[derive(Debug, Clone)]
pub struct FileCredentialHook {
    path: PathBuf,
}

impl FileCredentialHook {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, HookError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(HookError::Read {
                    path: self.path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| HookError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn write_error(&self, e: &impl std::fmt::Display) -> HookError {
        HookError::Write {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl CredentialHook for FileCredentialHook {
    async fn load(&self, key: &str) -> Result<Option<String>, HookError> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), HookError> {
        let mut values = self.read_all().await?;
        values.insert(key.to_owned(), value.to_owned());
        let body = serde_json::to_string_pretty(&values).map_err(|e| self.write_error(&e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(&e))?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options
            .open(&self.path)
            .await
            .map_err(|e| self.write_error(&e))?;

        // `mode` only applies to new files; tighten an existing one before
        // the token goes in.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.write_error(&e))?;
        }

        file.write_all(body.as_bytes())
            .await
            .map_err(|e| self.write_error(&e))?;
        file.flush().await.map_err(|e| self.write_error(&e))?;
        Ok(())
    }
}
