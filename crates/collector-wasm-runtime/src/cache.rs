//! Compiled module cache.
//!
//! The same guest binary is instantiated once per session; compiling it
//! again each time is the dominant startup cost. Modules are keyed by the
//! BLAKE3 hash of their bytes and evicted least-recently-used.
//!
//! # Examples
//!
//! ```
//! use collector_wasm_runtime::cache::ModuleCache;
//! use std::num::NonZeroUsize;
//!
//! let cache = ModuleCache::new(NonZeroUsize::new(8).unwrap());
//! let key = ModuleCache::cache_key_for_code(b"\0asm");
//! assert!(cache.get(&key).is_none());
//! assert_eq!(cache.stats().misses, 1);
//! ```

use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use wasmtime::Module;

/// BLAKE3 digest of a module's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(blake3::Hash);

impl CacheKey {
    /// Short hex prefix for logs.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.to_hex()[..16].to_string()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that found a compiled module
    pub hits: u64,
    /// Lookups that did not
    pub misses: u64,
    /// Modules currently cached
    pub len: usize,
    /// Maximum number of cached modules
    pub capacity: usize,
}

/// LRU cache of compiled modules.
pub struct ModuleCache {
    cache: Mutex<lru::LruCache<CacheKey, Module>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for ModuleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl ModuleCache {
    /// Creates a cache holding at most `capacity` modules.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(lru::LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Hashes module bytes into a cache key.
    #[must_use]
    pub fn cache_key_for_code(code: &[u8]) -> CacheKey {
        CacheKey(blake3::hash(code))
    }

    fn lock(&self) -> MutexGuard<'_, lru::LruCache<CacheKey, Module>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up a module, updating LRU order and hit counters.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Module> {
        let module = self.lock().get(key).cloned();
        if module.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        module
    }

    /// Inserts a module, evicting the least recently used one when full.
    pub fn insert(&self, key: CacheKey, module: Module) {
        let mut cache = self.lock();
        cache.put(key, module);
        tracing::debug!("Module cached: {} (cache size: {})", key.short(), cache.len());
    }

    /// Drops every cached module. Counters are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let cache = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: cache.len(),
            capacity: cache.cap().get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmtime::Engine;

    fn module(engine: &Engine, value: i32) -> Module {
        let wat = format!(r#"(module (func (export "main") (result i32) (i32.const {value})))"#);
        Module::new(engine, wat).unwrap()
    }

    #[test]
    fn test_cache_key_is_content_hash() {
        let a = ModuleCache::cache_key_for_code(b"one");
        let b = ModuleCache::cache_key_for_code(b"one");
        let c = ModuleCache::cache_key_for_code(b"two");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.short().len(), 16);
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let engine = Engine::default();
        let cache = ModuleCache::new(NonZeroUsize::new(2).unwrap());
        let key = ModuleCache::cache_key_for_code(b"m1");

        assert!(cache.get(&key).is_none());
        cache.insert(key, module(&engine, 1));
        assert!(cache.get(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.len, 1);
        assert_eq!(stats.capacity, 2);
    }

    #[test]
    fn test_lru_eviction() {
        let engine = Engine::default();
        let cache = ModuleCache::new(NonZeroUsize::new(2).unwrap());
        let keys: Vec<_> = [b"a", b"b", b"c"]
            .iter()
            .map(|code| ModuleCache::cache_key_for_code(*code))
            .collect();

        cache.insert(keys[0], module(&engine, 0));
        cache.insert(keys[1], module(&engine, 1));
        // Touch the first so the second becomes least recently used.
        assert!(cache.get(&keys[0]).is_some());
        cache.insert(keys[2], module(&engine, 2));

        assert!(cache.get(&keys[0]).is_some());
        assert!(cache.get(&keys[1]).is_none());
        assert!(cache.get(&keys[2]).is_some());
    }

    #[test]
    fn test_clear() {
        let engine = Engine::default();
        let cache = ModuleCache::new(NonZeroUsize::new(4).unwrap());
        let key = ModuleCache::cache_key_for_code(b"x");
        cache.insert(key, module(&engine, 7));

        cache.clear();
        assert_eq!(cache.stats().len, 0);
    }
}
