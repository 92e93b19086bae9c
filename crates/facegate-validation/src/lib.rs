// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # facegate Validation
//!
//! The validation stage and its collaborators:
//!
//! - [`remote`]: contract and HTTP client for the remote validation authority
//! - [`worker`]: [`ValidationWorker`], the cache-first decision loop
//! - [`monitor`]: headless decision display
//! - [`replay`]: feeds recorded embeddings into shared state
//!
//! ## Decision flow
//!
//! ```text
//! embedding? ──no──▶ NotFound
//!     │yes
//!     ▼
//! cache.verify ──hit──▶ Granted (+identity)
//!     │miss / error
//!     ▼
//! remote.validate ──verified──▶ cache.store, Granted (+identity)
//!     ├──rejected──▶ Denied
//!     └──error─────▶ Unavailable (+backoff)
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod monitor;
pub mod remote;
pub mod replay;
pub mod worker;

pub use monitor::{displayed_status, DecisionMonitor};
pub use remote::{HttpRemoteValidator, RemoteError, RemoteValidator, RemoteVerdict};
pub use replay::{load_replay_file, parse_replay, EmbeddingReplay};
pub use worker::{StatsHandle, ValidationStats, ValidationWorker, WorkerSettings};

use facegate_cache::CacheError;

/// Validation error types
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Remote validation failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid replay data: {0}")]
    Replay(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ValidationError>;
