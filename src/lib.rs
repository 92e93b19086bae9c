// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # facegate
//!
//! Real-time access control over face embeddings. A validation stage reads
//! the latest embedding from shared state, checks it against a local cache of
//! recently verified embeddings and, on a miss, asks a remote authority. The
//! authority's positive answers populate the cache.
//!
//! ## Crates
//!
//! - [`config`]: `facegate_configuration.toml` loading and validation
//! - [`observability`]: logging initialisation
//! - [`runtime`]: stop signal, pacer, stages, shared state
//! - [`cache`]: verified embeddings cache and its ANN stores
//! - [`validation`]: remote authority client and validation worker
//!
//! ## Feature Flags
//!
//! - **`redis-store`** (default): Redis + RediSearch cache backend
//! - **`file-logging`**: JSON log files per run
//!
//! ## Usage
//!
//! ```rust,no_run
//! use facegate::prelude::*;
//! use facegate::app;
//!
//! let config = facegate::config::FacegateConfig::default();
//! let stop = StopSignal::new();
//! let state = SharedState::new();
//!
//! let cache = app::connect_cache(&config.cache, &stop)?;
//! let remote = app::http_remote(&config.remote)?;
//! let stages = app::start_pipeline(&config, state, cache, remote, None, &stop)?;
//! stop.trigger();
//! stages.join_all();
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;

pub use facegate_cache as cache;
pub use facegate_config as config;
pub use facegate_observability as observability;
pub use facegate_runtime as runtime;
pub use facegate_validation as validation;

pub mod prelude {
    pub use crate::cache::{AnnStore, MemoryAnnStore, Verification, VerifiedEmbeddingsCache};
    pub use crate::runtime::{
        AccessDecision, Embedding, IdentityRecord, Pacer, SharedState, Stage, StopSignal,
        TickControl,
    };
    pub use crate::validation::{
        HttpRemoteValidator, RemoteValidator, RemoteVerdict, ValidationWorker,
    };
}
