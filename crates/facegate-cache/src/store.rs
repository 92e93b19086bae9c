// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Backing store contract
//!
//! The verified embeddings cache talks to its nearest-neighbour store only
//! through [`AnnStore`], so Redis and the in-process backend are
//! interchangeable.

use crate::{CacheResult, DEFAULT_INDEX_NAME, KEY_PREFIX};
use facegate_runtime::{Embedding, EMBEDDING_DIMENSIONS};
use std::time::Duration;

/// Index definition: tag field `name`, FLAT cosine vector field `embedding`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub index_name: String,
    pub key_prefix: String,
    pub dimension: usize,
}

impl IndexSchema {
    pub fn new(index_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            index_name: index_name.into(),
            key_prefix: KEY_PREFIX.to_string(),
            dimension,
        }
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_NAME, EMBEDDING_DIMENSIONS)
    }
}

/// Outcome of [`AnnStore::ensure_index`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Created,
    AlreadyExists,
}

/// Document written by [`AnnStore::upsert`]
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Tag-encoded identity name
    pub name: String,
    pub embedding: Embedding,
}

/// Closest live document to a query
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub key: String,
    /// Tag-encoded identity name
    pub name: String,
    /// Cosine distance in `[0, 2]`
    pub distance: f64,
}

pub trait AnnStore: Send + Sync {
    /// Liveness probe
    fn ping(&self) -> CacheResult<()>;

    /// Create the index if absent; never duplicates it
    fn ensure_index(&self, schema: &IndexSchema) -> CacheResult<IndexStatus>;

    /// Single nearest live document by cosine distance
    fn nearest(&self, query: &[f32]) -> CacheResult<Option<Neighbor>>;

    /// Write or overwrite `key`, expiring `ttl` from now
    fn upsert(&self, key: &str, entry: &StoredEntry, ttl: Duration) -> CacheResult<()>;

    /// Number of live documents
    fn len(&self) -> CacheResult<usize>;

    fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}
