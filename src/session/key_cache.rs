// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Key Cache
//!
//! Maps key name to raw key material. The cache is owned by the session
//! context and only touched under the context lock, so it is not synchronized
//! itself apart from its counters.
//!
//! **Security**: every removal path (delete, overwrite, eviction, wipe_all)
//! zeroes the material in place before the entry is dropped. Copies handed out
//! by [`KeyCache::get`] zero themselves on drop.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::crypto::KeyMaterial;

/// Cache limits
#[derive(Debug, Clone)]
pub struct KeyCacheConfig {
    /// Maximum cached keys; the oldest inserted key is evicted beyond this
    pub max_entries: usize,
}

impl Default for KeyCacheConfig {
    fn default() -> Self {
        Self { max_entries: 128 }
    }
}

/// Cache counters
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub inserts: AtomicU64,
    pub evictions: AtomicU64,
    /// Entries zeroed (delete, overwrite, eviction, cleanup)
    pub wipes: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_wipes(&self, count: u64) {
        self.wipes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            wipes: self.wipes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub wipes: u64,
}

impl CacheStatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Name → key material, bounded, insertion-ordered eviction
#[derive(Debug, Default)]
pub struct KeyCache {
    entries: HashMap<String, KeyMaterial>,
    order: VecDeque<String>,
    config: KeyCacheConfig,
    stats: CacheStats,
}

impl KeyCache {
    pub fn new(config: KeyCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    /// Copy of the cached material, recording a hit or a miss
    pub fn get(&self, name: &str) -> Option<KeyMaterial> {
        match self.entries.get(name) {
            Some(material) => {
                self.stats.record_hit();
                Some(material.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert or overwrite. The overwritten entry, or the oldest entry when
    /// the cache is full, is wiped first.
    pub fn insert(&mut self, name: &str, material: KeyMaterial) {
        if let Some(existing) = self.entries.get_mut(name) {
            existing.wipe();
            self.stats.record_wipes(1);
            *existing = material;
            self.stats.record_insert();
            return;
        }

        while self.entries.len() >= self.config.max_entries.max(1) {
            if !self.evict_oldest() {
                break;
            }
        }

        self.entries.insert(name.to_string(), material);
        self.order.push_back(name.to_string());
        self.stats.record_insert();
    }

    /// Wipe and remove `name`. Returns whether an entry existed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.entries.get_mut(name) {
            Some(material) => {
                material.wipe();
                self.entries.remove(name);
                self.order.retain(|n| n != name);
                self.stats.record_wipes(1);
                true
            }
            None => false,
        }
    }

    /// Wipe and remove every entry, returning how many were removed
    pub fn wipe_all(&mut self) -> usize {
        let count = self.entries.len();
        for material in self.entries.values_mut() {
            material.wipe();
        }
        self.entries.clear();
        self.order.clear();
        self.stats.record_wipes(count as u64);
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    fn evict_oldest(&mut self) -> bool {
        let Some(oldest) = self.order.pop_front() else {
            return false;
        };
        if let Some(mut material) = self.entries.remove(&oldest) {
            material.wipe();
            self.stats.record_wipes(1);
            self.stats.record_eviction();
            debug!(key_name = %oldest, "Evicted oldest cached key");
        }
        true
    }
}
