// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process nearest-neighbour store
//!
//! Brute-force cosine scan over an `RwLock<AHashMap>`. Expiry is enforced on
//! read against an injectable [`Clock`], so no background sweep is needed;
//! [`MemoryAnnStore::purge_expired`] reclaims memory on demand.

use crate::clock::{Clock, SystemClock};
use crate::codec::cosine_distance;
use crate::store::{AnnStore, IndexSchema, IndexStatus, Neighbor, StoredEntry};
use crate::{CacheError, CacheResult};
use ahash::AHashMap;
use facegate_runtime::Embedding;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone)]
struct MemoryEntry {
    name: String,
    embedding: Embedding,
    created_at: Instant,
    expires_at: Instant,
}

pub struct MemoryAnnStore {
    entries: RwLock<AHashMap<String, MemoryEntry>>,
    schema: RwLock<Option<IndexSchema>>,
    clock: Arc<dyn Clock>,
    reachable: AtomicBool,
}

impl MemoryAnnStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
            schema: RwLock::new(None),
            clock,
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulate the store going away (every call fails with `Unreachable`)
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Creation time of a live entry
    pub fn created_at(&self, key: &str) -> Option<Instant> {
        let now = self.clock.now();
        self.entries
            .read()
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.created_at)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.created_at(key).is_some()
    }

    fn check_reachable(&self) -> CacheResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unreachable("in-memory store marked unreachable".to_string()))
        }
    }

    fn indexed_dimension(&self) -> CacheResult<usize> {
        self.schema
            .read()
            .as_ref()
            .map(|schema| schema.dimension)
            .ok_or_else(|| CacheError::Backend("no such index".to_string()))
    }
}

impl Default for MemoryAnnStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnStore for MemoryAnnStore {
    fn ping(&self) -> CacheResult<()> {
        self.check_reachable()
    }

    fn ensure_index(&self, schema: &IndexSchema) -> CacheResult<IndexStatus> {
        self.check_reachable()?;
        let mut current = self.schema.write();
        if current.is_some() {
            return Ok(IndexStatus::AlreadyExists);
        }
        *current = Some(schema.clone());
        Ok(IndexStatus::Created)
    }

    fn nearest(&self, query: &[f32]) -> CacheResult<Option<Neighbor>> {
        self.check_reachable()?;
        let dimension = self.indexed_dimension()?;
        if query.len() != dimension {
            return Err(CacheError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        let now = self.clock.now();
        let entries = self.entries.read();
        let mut best: Option<Neighbor> = None;
        for (key, entry) in entries.iter() {
            if entry.expires_at <= now {
                continue;
            }
            let distance = cosine_distance(query, entry.embedding.as_slice());
            if best.as_ref().map_or(true, |b| distance < b.distance) {
                best = Some(Neighbor {
                    key: key.clone(),
                    name: entry.name.clone(),
                    distance,
                });
            }
        }

        trace!(
            "[CACHE] Scanned {} entries, best distance {:?}",
            entries.len(),
            best.as_ref().map(|b| b.distance)
        );
        Ok(best)
    }

    fn upsert(&self, key: &str, entry: &StoredEntry, ttl: Duration) -> CacheResult<()> {
        self.check_reachable()?;
        let dimension = self.indexed_dimension()?;
        if entry.embedding.dimension() != dimension {
            return Err(CacheError::DimensionMismatch {
                expected: dimension,
                actual: entry.embedding.dimension(),
            });
        }

        let now = self.clock.now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            CacheError::InvalidEntry(format!("ttl of {}s is out of range", ttl.as_secs()))
        })?;
        self.entries.write().insert(
            key.to_string(),
            MemoryEntry {
                name: entry.name.clone(),
                embedding: entry.embedding.clone(),
                created_at: now,
                expires_at,
            },
        );
        Ok(())
    }

    fn len(&self) -> CacheResult<usize> {
        self.check_reachable()?;
        let now = self.clock.now();
        Ok(self
            .entries
            .read()
            .values()
            .filter(|entry| entry.expires_at > now)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_with_clock() -> (MemoryAnnStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = MemoryAnnStore::with_clock(clock.clone());
        store.ensure_index(&IndexSchema::new("test", 3)).unwrap();
        (store, clock)
    }

    fn entry(name: &str, values: [f32; 3]) -> StoredEntry {
        StoredEntry {
            name: name.to_string(),
            embedding: Embedding::new(values.to_vec()),
        }
    }

    #[test]
    fn test_ensure_index_idempotent() {
        let store = MemoryAnnStore::new();
        let schema = IndexSchema::new("test", 3);
        assert_eq!(store.ensure_index(&schema).unwrap(), IndexStatus::Created);
        assert_eq!(store.ensure_index(&schema).unwrap(), IndexStatus::AlreadyExists);
        assert_eq!(store.ensure_index(&schema).unwrap(), IndexStatus::AlreadyExists);
    }

    #[test]
    fn test_query_without_index_fails() {
        let store = MemoryAnnStore::new();
        assert!(matches!(store.nearest(&[1.0, 0.0, 0.0]), Err(CacheError::Backend(_))));
    }

    #[test]
    fn test_nearest_picks_closest() {
        let (store, _) = store_with_clock();
        let ttl = Duration::from_secs(60);
        store.upsert("doc:a", &entry("a", [1.0, 0.0, 0.0]), ttl).unwrap();
        store.upsert("doc:b", &entry("b", [0.0, 1.0, 0.0]), ttl).unwrap();

        let hit = store.nearest(&[0.1, 0.9, 0.0]).unwrap().unwrap();
        assert_eq!(hit.key, "doc:b");
        assert_eq!(hit.name, "b");
        assert!(hit.distance < 0.01);
    }

    #[test]
    fn test_empty_store_has_no_neighbor() {
        let (store, _) = store_with_clock();
        assert!(store.nearest(&[1.0, 0.0, 0.0]).unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_expired_entries_invisible_and_purged() {
        let (store, clock) = store_with_clock();
        store
            .upsert("doc:a", &entry("a", [1.0, 0.0, 0.0]), Duration::from_secs(10))
            .unwrap();

        clock.advance(Duration::from_secs(9));
        assert_eq!(store.len().unwrap(), 1);

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.len().unwrap(), 0);
        assert!(store.nearest(&[1.0, 0.0, 0.0]).unwrap().is_none());
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.purge_expired(), 0);
    }

    #[test]
    fn test_dimension_checked() {
        let (store, _) = store_with_clock();
        assert!(matches!(
            store.nearest(&[1.0, 0.0]),
            Err(CacheError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        let bad = StoredEntry {
            name: "x".to_string(),
            embedding: Embedding::new(vec![1.0; 4]),
        };
        assert!(store.upsert("doc:x", &bad, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_unrepresentable_ttl_rejected() {
        let (store, _) = store_with_clock();
        let result = store.upsert("doc:a", &entry("a", [1.0, 0.0, 0.0]), Duration::MAX);
        assert!(matches!(result, Err(CacheError::InvalidEntry(_))));
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_unreachable_store_fails_every_call() {
        let (store, _) = store_with_clock();
        store.set_reachable(false);
        assert!(matches!(store.ping(), Err(CacheError::Unreachable(_))));
        assert!(store.nearest(&[1.0, 0.0, 0.0]).is_err());
        assert!(store.len().is_err());
        store.set_reachable(true);
        assert!(store.ping().is_ok());
    }
}
