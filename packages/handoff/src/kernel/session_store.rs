//! Durable session storage for the verification handle.
//!
//! The handle has one canonical home: a durable key/value store that
//! survives a reload. [`HandleStore`] puts an in-memory cache in front of it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::BaseSessionStore;
use crate::domains::auth::errors::VerifyError;
use crate::domains::auth::models::StoredHandle;

/// Key the live verification handle is stored under.
pub const HANDLE_STORAGE_KEY: &str = "verificationId";

// =============================================================================
// File-backed store
// =============================================================================

/// JSON object file of string keys to string values.
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt session store {}", self.path.display()))
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl BaseSessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaseSessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// Handle store (cache + durable)
// =============================================================================

/// Typed access to the stored [`StoredHandle`], cached in memory.
pub struct HandleStore {
    durable: Arc<dyn BaseSessionStore>,
    cache: Mutex<Option<StoredHandle>>,
}

impl HandleStore {
    pub fn new(durable: Arc<dyn BaseSessionStore>) -> Self {
        Self {
            durable,
            cache: Mutex::new(None),
        }
    }

    /// Cached handle, falling back to durable storage.
    ///
    /// An unreadable record is dropped rather than failing the flow; the
    /// user can always request a new code.
    pub fn load(&self) -> Option<StoredHandle> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(stored) = cache.as_ref() {
            return Some(stored.clone());
        }

        let raw = match self.durable.get(HANDLE_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read stored verification handle: {:#}", e);
                return None;
            }
        };

        match serde_json::from_str::<StoredHandle>(&raw) {
            Ok(stored) => {
                debug!(issued_at = %stored.issued_at, "Loaded verification handle from storage");
                *cache = Some(stored.clone());
                Some(stored)
            }
            Err(e) => {
                warn!("Discarding unreadable verification handle: {}", e);
                if let Err(e) = self.durable.remove(HANDLE_STORAGE_KEY) {
                    warn!("Failed to remove unreadable handle: {:#}", e);
                }
                None
            }
        }
    }

    pub fn save(&self, stored: StoredHandle) -> crate::domains::auth::errors::Result<()> {
        let raw =
            serde_json::to_string(&stored).map_err(|e| VerifyError::Storage(e.to_string()))?;
        self.durable
            .set(HANDLE_STORAGE_KEY, &raw)
            .map_err(|e| VerifyError::Storage(format!("{:#}", e)))?;
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(stored);
        Ok(())
    }

    /// Forget the handle. Storage errors are logged, not returned: a stale
    /// record only costs the user a resend.
    pub fn clear(&self) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = None;
        if let Err(e) = self.durable.remove(HANDLE_STORAGE_KEY) {
            warn!("Failed to clear stored verification handle: {:#}", e);
        }
    }
}
