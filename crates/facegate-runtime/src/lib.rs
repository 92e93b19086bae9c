// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # facegate Runtime
//!
//! Runtime state and scheduling shared by every facegate pipeline stage.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  ┌───────────┐  ┌────────────┐  ┌──────────┐
//! │ capture  │  │ detection │  │ validation │  │  render  │   ← one thread per stage,
//! └────┬─────┘  └─────┬─────┘  └─────┬──────┘  └────┬─────┘     each driven by a Pacer
//!      │              │              │              │
//!      ▼              ▼              ▼              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │   SharedState (single parking_lot::Mutex, overwrite)    │   ← only cross-stage channel
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use facegate_runtime::{spawn, Pacer, SharedState, Stage, StopSignal, TickControl};
//!
//! struct Heartbeat;
//!
//! impl Stage for Heartbeat {
//!     fn name(&self) -> &str {
//!         "heartbeat"
//!     }
//!
//!     fn tick(&mut self) -> TickControl {
//!         TickControl::Continue
//!     }
//! }
//!
//! let stop = StopSignal::new();
//! let handle = spawn(Heartbeat, Pacer::from_hz(30.0)?, stop.clone())?;
//! stop.trigger();
//! let iterations = handle.join()?;
//! # Ok::<(), facegate_runtime::RuntimeError>(())
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backoff;
pub mod pacer;
pub mod shared_state;
pub mod stage;
pub mod stop;
pub mod types;

pub use backoff::BackoffStrategy;
pub use pacer::{sleep_responsive, Pacer, TickControl, DEFAULT_IDLE_INTERVAL};
pub use shared_state::{SharedState, StateSnapshot, StateUpdate};
pub use stage::{spawn, Stage, StageHandle, StageSet};
pub use stop::StopSignal;
pub use types::{AccessDecision, Embedding, Frame, IdentityRecord, EMBEDDING_DIMENSIONS};

/// Runtime error types
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Pacer rate is zero, negative or not finite
    #[error("Invalid pacing rate: {0} Hz")]
    InvalidRate(f64),

    /// OS refused to start a stage thread
    #[error("Failed to spawn stage '{stage}': {source}")]
    Spawn {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    /// Stage thread panicked before finishing
    #[error("Stage '{0}' panicked")]
    StagePanicked(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
