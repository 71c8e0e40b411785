//! # pdm-store
//!
//! Secret storage for the PDM broker, over two lifetimes:
//!
//! - **persistent**: survives process restart; one JSON file per key under a
//!   data directory; suitable only for ciphertext and non-secret records.
//! - **ephemeral**: an in-memory map cleared when the store is dropped;
//!   holds the session restore token and nothing else secret-adjacent.
//!
//! Every key must carry the reserved `pdm_` prefix. Credentials go through
//! the persistent lifetime only, and only as `(salt, iv, ciphertext)` blobs
//! assembled by the session manager.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

mod errors;

pub use errors::StoreError;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Reserved key prefix for the broker's namespace.
pub const STORE_PREFIX: &str = "pdm_";

/// Handle to the broker's secret storage. Cheap to clone; clones share both
/// lifetimes, which is also how a rebuilt broker context inherits the
/// ephemeral restore token after a short restart.
#[derive(Clone)]
pub struct SecretStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    data_dir: PathBuf,
    ephemeral: Mutex<HashMap<String, serde_json::Value>>,
}

fn lock_ephemeral(
    mutex: &Mutex<HashMap<String, serde_json::Value>>,
) -> MutexGuard<'_, HashMap<String, serde_json::Value>> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Ephemeral store mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl SecretStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .map_err(|e| StoreError::Io(format!("Cannot create data directory: {e}")))?;
        tracing::info!(dir = %data_dir.display(), "Opened secret store");
        Ok(Self {
            inner: Arc::new(StoreInner {
                data_dir,
                ephemeral: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Open a store at the platform-default data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        let dirs = directories::ProjectDirs::from("io", "pdm", "pdm")
            .ok_or_else(|| StoreError::Io("Cannot resolve a home directory".into()))?;
        Self::open(dirs.data_dir())
    }

    /// Directory holding the persistent files.
    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    pub fn put_persistent<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, &content)
            .map_err(|e| StoreError::Io(format!("Failed to write {key}: {e}")))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| StoreError::Io(format!("Failed to commit {key}: {e}")))?;

        set_restrictive_permissions(&path)?;
        Ok(())
    }

    pub fn get_persistent<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| StoreError::Io(format!("Failed to read {key}: {e}")))?;
        let value = serde_json::from_str(&content)
            .map_err(|e| StoreError::Serialization(format!("Failed to parse {key}: {e}")))?;
        Ok(Some(value))
    }

    pub fn remove_persistent(&self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| StoreError::Io(format!("Failed to delete {key}: {e}")))?;
        }
        Ok(())
    }

    /// Enumerate every persistent key, for migration and diagnostics.
    pub fn persistent_keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.inner.data_dir)
            .map_err(|e| StoreError::Io(format!("Cannot read data directory: {e}")))?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Io(format!("Cannot read entry: {e}")))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(stem) = name.strip_suffix(".json") {
                keys.push(desanitize(stem));
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Bulk read of every persistent entry, for migration and diagnostics.
    pub fn get_all_persistent(&self) -> Result<Vec<(String, serde_json::Value)>, StoreError> {
        let mut entries = Vec::new();
        for key in self.persistent_keys()? {
            if let Some(value) = self.get_persistent(&key)? {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }

    pub fn put_ephemeral(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        validate_key(key)?;
        lock_ephemeral(&self.inner.ephemeral).insert(key.to_string(), value);
        Ok(())
    }

    pub fn get_ephemeral(&self, key: &str) -> Option<serde_json::Value> {
        lock_ephemeral(&self.inner.ephemeral).get(key).cloned()
    }

    pub fn remove_ephemeral(&self, key: &str) {
        lock_ephemeral(&self.inner.ephemeral).remove(key);
    }

    /// Drop all ephemeral state, as a process exit would.
    pub fn clear_ephemeral(&self) {
        lock_ephemeral(&self.inner.ephemeral).clear();
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.inner.data_dir.join(format!("{}.json", sanitize(key))))
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    if !key.starts_with(STORE_PREFIX) {
        return Err(StoreError::InvalidKey(format!(
            "key '{key}' is outside the reserved '{STORE_PREFIX}' namespace"
        )));
    }
    if key.len() > 256 {
        return Err(StoreError::InvalidKey("key exceeds 256 characters".into()));
    }
    Ok(())
}

// Keys may embed DID strings; ':' maps to a filename-safe marker and back.
fn sanitize(key: &str) -> String {
    key.replace(':', "#")
}

fn desanitize(stem: &str) -> String {
    stem.replace('#', ":")
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, perms)
        .map_err(|e| StoreError::Io(format!("Failed to set file permissions: {e}")))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_restrictive_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
