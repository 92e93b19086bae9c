// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Verified embeddings cache
//!
//! Wraps an [`AnnStore`] with the lookup policy: a 1-NN cosine query whose
//! similarity must strictly exceed [`MATCH_THRESHOLD`], and population keyed by
//! content hash with a fixed TTL.

use crate::codec::{cache_key, decode_tag, encode_tag};
use crate::store::{AnnStore, IndexSchema, IndexStatus, StoredEntry};
use crate::{
    CacheError, CacheResult, CONNECT_RETRY_INTERVAL, DEFAULT_INDEX_NAME, ENTRY_TTL,
    MATCH_THRESHOLD,
};
use facegate_runtime::{
    sleep_responsive, BackoffStrategy, Embedding, IdentityRecord, StopSignal, EMBEDDING_DIMENSIONS,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub index_name: String,
    pub dimension: usize,
    /// Entry lifetime from write time
    pub ttl: Duration,
    /// Delay between liveness probes in [`VerifiedEmbeddingsCache::connect`]
    pub connect_retry_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            dimension: EMBEDDING_DIMENSIONS,
            ttl: ENTRY_TTL,
            connect_retry_interval: CONNECT_RETRY_INTERVAL,
        }
    }
}

/// Result of [`VerifiedEmbeddingsCache::verify`]
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Match(IdentityRecord),
    NoMatch,
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match(_))
    }

    pub fn identity(&self) -> Option<&IdentityRecord> {
        match self {
            Verification::Match(identity) => Some(identity),
            Verification::NoMatch => None,
        }
    }
}

pub struct VerifiedEmbeddingsCache {
    store: Arc<dyn AnnStore>,
    schema: IndexSchema,
    ttl: Duration,
    connect_retry_interval: Duration,
}

impl VerifiedEmbeddingsCache {
    pub fn new(store: Arc<dyn AnnStore>, settings: CacheSettings) -> Self {
        Self {
            store,
            schema: IndexSchema::new(settings.index_name, settings.dimension),
            ttl: settings.ttl,
            connect_retry_interval: settings.connect_retry_interval,
        }
    }

    /// Block until the store answers a ping
    ///
    /// Retries forever on a fixed interval, logging every failed attempt.
    /// Returns the number of attempts made, or [`CacheError::Aborted`] once
    /// `stop` is triggered.
    pub fn connect(&self, stop: &StopSignal) -> CacheResult<u32> {
        let mut retry = BackoffStrategy::fixed(self.connect_retry_interval);
        let mut attempts = 0u32;

        loop {
            if stop.is_triggered() {
                warn!("[CACHE] Connection wait aborted after {} attempt(s)", attempts);
                return Err(CacheError::Aborted);
            }

            attempts += 1;
            match self.store.ping() {
                Ok(()) => {
                    info!("[CACHE] ✓ Backing store reachable (attempt {})", attempts);
                    return Ok(attempts);
                }
                Err(e) => {
                    let delay = retry.next_backoff();
                    warn!(
                        "[CACHE] Backing store not ready (attempt {}): {} - retrying in {:?}",
                        attempts, e, delay
                    );
                    sleep_responsive(delay, stop);
                }
            }
        }
    }

    /// Create the vector index unless it already exists
    pub fn ensure_index(&self) -> CacheResult<IndexStatus> {
        let status = self.store.ensure_index(&self.schema)?;
        match status {
            IndexStatus::Created => info!(
                "[CACHE] Index '{}' created (FLAT, COSINE, dim {})",
                self.schema.index_name, self.schema.dimension
            ),
            IndexStatus::AlreadyExists => {
                debug!("[CACHE] Index '{}' already exists", self.schema.index_name)
            }
        }
        Ok(status)
    }

    /// Match `embedding` against the nearest live entry
    pub fn verify(&self, embedding: &Embedding) -> CacheResult<Verification> {
        self.check_dimension(embedding)?;

        let Some(neighbor) = self.store.nearest(embedding.as_slice())? else {
            debug!("[CACHE] Miss: no live entries");
            return Ok(Verification::NoMatch);
        };

        let similarity = 1.0 - neighbor.distance;
        if similarity > MATCH_THRESHOLD {
            let name = decode_tag(&neighbor.name);
            debug!(
                "[CACHE] Hit {} ({}) similarity {:.4}",
                neighbor.key, name, similarity
            );
            Ok(Verification::Match(IdentityRecord::new(
                name,
                (similarity * 100.0) as f32,
            )))
        } else {
            debug!(
                "[CACHE] Miss: nearest {} similarity {:.4} not above {}",
                neighbor.key, similarity, MATCH_THRESHOLD
            );
            Ok(Verification::NoMatch)
        }
    }

    /// Write `embedding` under its content-hash key, refreshing the TTL
    pub fn store(&self, embedding: &Embedding, name: &str) -> CacheResult<String> {
        self.check_dimension(embedding)?;

        let key = cache_key(embedding.as_slice());
        let entry = StoredEntry {
            name: encode_tag(name),
            embedding: embedding.clone(),
        };
        self.store.upsert(&key, &entry, self.ttl)?;
        debug!("[CACHE] Stored {} as '{}' (ttl {:?})", key, name, self.ttl);
        Ok(key)
    }

    /// Live entry count
    pub fn len(&self) -> CacheResult<usize> {
        self.store.len()
    }

    pub fn is_empty(&self) -> CacheResult<bool> {
        self.store.is_empty()
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn check_dimension(&self, embedding: &Embedding) -> CacheResult<()> {
        if embedding.dimension() != self.schema.dimension {
            return Err(CacheError::DimensionMismatch {
                expected: self.schema.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(())
    }
}
