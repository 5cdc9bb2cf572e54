//! Time- and size-bounded cache for search results
//!
//! Keys are a 64-bit hash of (query, lat, lon). Entries expire after a fixed
//! TTL and the least recently used entry is evicted when the cache is full.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use super::Place;

/// Deterministic cache key for a search request.
pub fn cache_key(query: &str, latitude: Option<f64>, longitude: Option<f64>) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    // Hash coordinates by bit pattern so f64 keys stay deterministic.
    latitude.map(f64::to_bits).hash(&mut hasher);
    longitude.map(f64::to_bits).hash(&mut hasher);
    hasher.finish()
}

struct CacheEntry {
    results: Vec<Place>,
    inserted_at: Instant,
    last_used: u64,
}

/// LRU cache with per-entry TTL.
pub struct SearchCache {
    entries: HashMap<u64, CacheEntry>,
    capacity: usize,
    ttl: Duration,
    // Monotonic use counter; cheaper than tracking timestamps for recency.
    tick: u64,
}

impl SearchCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            ttl,
            tick: 0,
        }
    }

    /// Look up previously normalized results. Expired entries are dropped on
    /// access; a hit refreshes recency.
    pub fn get(&mut self, key: u64) -> Option<Vec<Place>> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: u64, now: Instant) -> Option<Vec<Place>> {
        let expired = match self.entries.get(&key) {
            Some(entry) => now.duration_since(entry.inserted_at) >= self.ttl,
            None => return None,
        };

        if expired {
            self.entries.remove(&key);
            return None;
        }

        self.tick += 1;
        let entry = self.entries.get_mut(&key)?;
        entry.last_used = self.tick;
        Some(entry.results.clone())
    }

    /// Store normalized results, evicting the least recently used entry when
    /// the cache is at capacity.
    pub fn insert(&mut self, key: u64, results: Vec<Place>) {
        self.insert_at(key, results, Instant::now())
    }

    pub fn insert_at(&mut self, key: u64, results: Vec<Place>, now: Instant) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(&lru_key) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key)
            {
                self.entries.remove(&lru_key);
            }
        }

        self.tick += 1;
        self.entries.insert(
            key,
            CacheEntry {
                results,
                inserted_at: now,
                last_used: self.tick,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
