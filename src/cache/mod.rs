//! Query result cache.
//!
//! Maps a [`QueryKey`] to the ordered list of objects a search returned. The
//! cache never performs I/O and is never invalidated by writes made elsewhere
//! in the session: staleness is controlled per call with the `use_cache` flag.
//!
//! Growth is governed by a [`CachePolicy`]. [`CachePolicy::Unbounded`] keeps
//! every entry for the lifetime of the session, which suits short-lived
//! sessions. [`CachePolicy::Lru`] bounds the number of keys and evicts the least
//! recently used one.
//!
//! # Example
//!
//! ```rust
//! use ad_directory::cache::{CachePolicy, QueryCache};
//! use ad_directory::query::QueryConfig;
//!
//! let mut cache = QueryCache::new(CachePolicy::Lru { capacity: 2 });
//! let config = QueryConfig::new("DC=example,DC=com");
//!
//! cache.add(Some("(cn=a)"), Vec::new(), &config);
//! assert!(cache.get(Some("(cn=a)"), &config).is_some());
//! assert!(cache.get(Some("(CN=a)"), &config).is_none());
//! ```

use crate::object::DirectoryObject;
use crate::query::{QueryConfig, QueryKey};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// How the cache bounds its growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePolicy {
    /// Keep every entry until the session ends or the cache is cleared.
    #[default]
    Unbounded,
    /// Keep at most `capacity` keys, evicting the least recently used.
    Lru { capacity: usize },
}

/// Counters for cache behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Cache of search results keyed by (filter, query configuration).
#[derive(Debug, Clone)]
pub struct QueryCache {
    policy: CachePolicy,
    entries: HashMap<QueryKey, Vec<DirectoryObject>>,
    // least recently used at the front; only maintained for LRU
    recency: VecDeque<QueryKey>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl QueryCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            recency: VecDeque::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Cached result for exactly this filter and configuration.
    pub fn get(&mut self, filter: Option<&str>, config: &QueryConfig) -> Option<Vec<DirectoryObject>> {
        let key = QueryKey::new(filter, config);
        match self.entries.get(&key) {
            Some(objects) => {
                let objects = objects.clone();
                self.hits += 1;
                self.touch(&key);
                trace!("Cache hit for {} ({} objects)", key, objects.len());
                Some(objects)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store or overwrite the result for this filter and configuration.
    pub fn add(&mut self, filter: Option<&str>, objects: Vec<DirectoryObject>, config: &QueryConfig) {
        let key = QueryKey::new(filter, config);
        if let CachePolicy::Lru { capacity } = self.policy {
            if capacity == 0 {
                return;
            }
            if !self.entries.contains_key(&key) {
                while self.entries.len() >= capacity {
                    if !self.evict_oldest() {
                        break;
                    }
                }
            }
            self.touch(&key);
        }
        self.entries.insert(key, objects);
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    fn touch(&mut self, key: &QueryKey) {
        if !matches!(self.policy, CachePolicy::Lru { .. }) {
            return;
        }
        if let Some(index) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(index);
        }
        self.recency.push_back(key.clone());
    }

    fn evict_oldest(&mut self) -> bool {
        match self.recency.pop_front() {
            Some(oldest) => {
                self.entries.remove(&oldest);
                self.evictions += 1;
                trace!("Evicted cache entry {}", oldest);
                true
            }
            None => false,
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}
