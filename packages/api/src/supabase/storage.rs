//! Where the session survives between page loads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key/value persistence for the serialized session.
pub trait SessionStorage {
    fn load(&self, key: &str) -> Option<String>;
    fn store(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Process-local storage; the session is forgotten on exit.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) {
        self.entries().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }
}

/// The browser's `localStorage`. Storage errors (private mode, quota) are
/// logged and otherwise ignored, leaving the session in memory only.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Debug, Default)]
pub struct LocalSessionStorage;

#[cfg(target_arch = "wasm32")]
impl LocalSessionStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window().and_then(|window| window.local_storage().ok().flatten())
    }
}

#[cfg(target_arch = "wasm32")]
impl SessionStorage for LocalSessionStorage {
    fn load(&self, key: &str) -> Option<String> {
        Self::storage().and_then(|storage| storage.get_item(key).ok().flatten())
    }

    fn store(&self, key: &str, value: &str) {
        let stored = Self::storage().map(|storage| storage.set_item(key, value));
        if !matches!(stored, Some(Ok(()))) {
            tracing::warn!(key, "could not persist session to localStorage");
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub type PlatformStorage = LocalSessionStorage;
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStorage = MemorySessionStorage;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_is_shared_between_clones() {
        let storage = MemorySessionStorage::new();
        let other = storage.clone();

        storage.store("sb-abcd-auth-token", "{}");
        assert_eq!(other.load("sb-abcd-auth-token").as_deref(), Some("{}"));

        other.remove("sb-abcd-auth-token");
        assert_eq!(storage.load("sb-abcd-auth-token"), None);
    }
}
