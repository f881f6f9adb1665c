//! Fallback storage for login state that must survive a page load.
//!
//! Two slots per module:
//!
//! - `<module>.AuthResult`: one-shot. Written by the callback page when it
//!   was not opened as a popup, consumed on the next mount.
//! - `<module>.AuthInfo`: durable. The last successful identity, restored
//!   on mount until logout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tapgate_protocol::{AuthInfo, AuthResult, Codec, JsonCodec};

/// Key/value storage the browser side persists to (`localStorage`).
pub trait FallbackStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// In-process [`FallbackStorage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FallbackStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.slots().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.slots().remove(key);
    }
}

/// Typed access to one module's two slots.
#[derive(Clone)]
pub struct AuthSlots {
    storage: Arc<dyn FallbackStorage>,
    result_key: String,
    info_key: String,
}

impl AuthSlots {
    pub fn new(module: &str, storage: Arc<dyn FallbackStorage>) -> Self {
        Self {
            storage,
            result_key: format!("{module}.AuthResult"),
            info_key: format!("{module}.AuthInfo"),
        }
    }

    /// Key of the one-shot result slot.
    pub fn result_key(&self) -> &str {
        &self.result_key
    }

    /// Key of the durable identity slot.
    pub fn info_key(&self) -> &str {
        &self.info_key
    }

    /// Takes the one-shot result, clearing the slot even when it is corrupt.
    pub fn take_result(&self) -> Option<AuthResult> {
        let result = self.read(&self.result_key);
        self.storage.remove(&self.result_key);
        result
    }

    pub fn load_info(&self) -> Option<AuthInfo> {
        self.read(&self.info_key)
    }

    pub fn save_info(&self, info: &AuthInfo) {
        self.write(&self.info_key, info);
    }

    pub fn clear_info(&self) {
        self.storage.remove(&self.info_key);
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.storage.get(key)?;
        match JsonCodec.decode_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "ignoring corrupt login slot");
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) {
        match JsonCodec.encode_str(value) {
            Ok(json) => self.storage.set(key, json),
            Err(err) => tracing::warn!(key, error = %err, "failed to persist login slot"),
        }
    }
}
