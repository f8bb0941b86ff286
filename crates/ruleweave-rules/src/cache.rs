//! Bounded cache of compose results.
//!
//! Keys hash the rule set fingerprint together with the normalized target path
//! and the options, so a reloaded rule set never serves stale bundles. Errors
//! are not cached. Eviction is FIFO by insertion.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::compose::{ComposeOptions, CompositionBundle, compose};
use crate::errors::Result;
use crate::glob::normalize_path;
use crate::store::RuleSet;

/// Default number of cached bundles.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, Arc<CompositionBundle>>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

/// Hit and miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to compose.
    pub misses: u64,
}

/// Thread-safe compose cache.
pub struct ComposeCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl Default for ComposeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for ComposeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposeCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl ComposeCache {
    /// Create a cache holding at most `capacity` bundles. Zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// Return the cached bundle or compose and remember it.
    ///
    /// Composition runs outside the lock.
    pub fn get_or_compose(
        &self,
        rule_set: &RuleSet,
        target_path: &str,
        options: &ComposeOptions,
    ) -> Result<Arc<CompositionBundle>> {
        if self.capacity == 0 {
            return compose(rule_set, target_path, options).map(Arc::new);
        }

        let key = cache_key(rule_set, target_path, options);
        {
            let mut inner = self.inner.lock();
            if let Some(hit) = inner.entries.get(&key).cloned() {
                inner.hits += 1;
                return Ok(hit);
            }
            inner.misses += 1;
        }

        let bundle = Arc::new(compose(rule_set, target_path, options)?);

        let mut inner = self.inner.lock();
        if !inner.entries.contains_key(&key) {
            while inner.order.len() >= self.capacity {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                let _ = inner.entries.remove(&oldest);
            }
            inner.order.push_back(key.clone());
            let _ = inner.entries.insert(key, Arc::clone(&bundle));
        }
        debug!(cached = inner.entries.len(), "compose cache miss");
        Ok(bundle)
    }

    /// Number of cached bundles.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached bundles.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hit and miss counters since creation or the last [`Self::clear`].
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    /// Drop every cached bundle and reset counters.
    pub fn clear(&self) {
        *self.inner.lock() = CacheInner::default();
    }
}

fn cache_key(rule_set: &RuleSet, target_path: &str, options: &ComposeOptions) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule_set.fingerprint().as_bytes());
    hasher.update([0]);
    hasher.update(normalize_path(target_path).as_bytes());
    hasher.update([0]);
    match options.max_bytes {
        Some(max) => {
            hasher.update([1]);
            hasher.update(max.to_le_bytes());
        }
        None => hasher.update([0]),
    }
    hasher.update(options.max_reference_depth.to_le_bytes());
    format!("{:x}", hasher.finalize())
}
