//! src/live/registry.rs
//! Path -> keys map consulted by the interception VFS

use crate::builders::ValidationPolicy;
use crate::kdf::KeyContext;
use crate::utils::normalize_path;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Keys and policy for one registered container.
#[derive(Debug)]
pub struct RegisteredKeys {
    keys: KeyContext,
    validation: ValidationPolicy,
}

impl RegisteredKeys {
    pub fn new(keys: KeyContext, validation: ValidationPolicy) -> Self {
        Self { keys, validation }
    }

    #[inline(always)]
    pub fn keys(&self) -> &KeyContext {
        &self.keys
    }

    #[inline(always)]
    pub const fn validation(&self) -> ValidationPolicy {
        self.validation
    }
}

/// Thread-safe registry keyed by normalized path.
///
/// The lock is held only for the map operation itself; callers get an
/// [`Arc`] and do all crypto outside it. Besides the keys it counts the open
/// guarded connections per path, so the entry goes away with the last one.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    inner: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    keys: HashMap<String, Arc<RegisteredKeys>>,
    open: HashMap<String, usize>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `path`.
    pub fn insert(&self, path: &Path, entry: RegisteredKeys) {
        let key = normalize_path(path);
        tracing::debug!(path = %key, "registry entry stored");
        self.inner.lock().keys.insert(key, Arc::new(entry));
    }

    /// Remove the entry for `path`; `true` if one existed.
    pub fn remove(&self, path: &Path) -> bool {
        let key = normalize_path(path);
        self.inner.lock().keys.remove(&key).is_some()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<RegisteredKeys>> {
        self.get_normalized(&normalize_path(path))
    }

    /// Lookup by an already-normalized key (the VFS normalizes once per open).
    pub fn get_normalized(&self, key: &str) -> Option<Arc<RegisteredKeys>> {
        self.inner.lock().keys.get(key).cloned()
    }

    /// Count one more open connection on `path`. Returns the normalized key
    /// to hand back to [`release`](Self::release).
    pub fn acquire(&self, path: &Path) -> String {
        let key = normalize_path(path);
        *self.inner.lock().open.entry(key.clone()).or_insert(0) += 1;
        key
    }

    /// Drop one open connection on `key`. The last one also removes the
    /// keys; `true` if that happened.
    pub fn release(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(count) = inner.open.get_mut(key) else {
            return false;
        };
        *count -= 1;
        if *count > 0 {
            return false;
        }
        inner.open.remove(key);
        inner.keys.remove(key).is_some()
    }

    /// Open guarded connections on `path`.
    pub fn open_count(&self, path: &Path) -> usize {
        let key = normalize_path(path);
        self.inner.lock().open.get(&key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
