// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # facegate Verified Embeddings Cache
//!
//! Local accelerator in front of the remote validation authority: embeddings
//! the authority has confirmed are stored here for one hour, and incoming
//! embeddings are matched against them by cosine similarity before any network
//! call is made.
//!
//! ## Layout
//! - [`codec`]: content-hash keys, wire encoding, cosine distance
//! - [`clock`]: injectable time source for TTL
//! - [`store`]: the [`AnnStore`] backend contract
//! - [`memory`]: in-process backend
//! - `redis_store`: RediSearch backend (feature `redis-store`)
//! - [`cache`]: [`VerifiedEmbeddingsCache`] (connect, ensure_index, verify, store)
//!
//! ## Features
//! - `redis-store` (default): Redis + RediSearch backend

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cache;
pub mod clock;
pub mod codec;
pub mod memory;
pub mod store;

#[cfg(feature = "redis-store")]
pub mod redis_store;

use std::time::Duration;

pub use cache::{CacheSettings, Verification, VerifiedEmbeddingsCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{cache_key, cosine_distance, decode_tag, encode_tag};
pub use memory::MemoryAnnStore;
pub use store::{AnnStore, IndexSchema, IndexStatus, Neighbor, StoredEntry};

#[cfg(feature = "redis-store")]
pub use redis_store::{RedisAnnStore, RedisSettings};

/// Index name used when none is configured
pub const DEFAULT_INDEX_NAME: &str = "embeddings_index";

/// Key prefix shared by every cache document
pub const KEY_PREFIX: &str = "doc:";

/// Lifetime of a cache entry, absolute from write time
pub const ENTRY_TTL: Duration = Duration::from_secs(3600);

/// Similarity (`1 - cosine distance`) an entry must strictly exceed to match
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Interval between liveness probes while waiting for the backing store
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Cache error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Backing store did not answer
    #[error("Cache store unreachable: {0}")]
    Unreachable(String),

    /// Backing store answered with an error
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Embedding length does not match the index dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Stored document is malformed or could not be decoded
    #[error("Invalid cache entry: {0}")]
    InvalidEntry(String),

    /// Waiting for the store was cancelled by the stop signal
    #[error("Cache connection aborted")]
    Aborted,
}

#[cfg(feature = "redis-store")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            CacheError::Unreachable(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
