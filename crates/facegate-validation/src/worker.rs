// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Validation stage
//!
//! Each tick reads the latest embedding, resolves it against the verified
//! cache and, on a miss, against the remote authority, then publishes the
//! decision and identity together. Nothing here holds the shared-state lock
//! across a cache or network call.

use crate::remote::{RemoteError, RemoteValidator, RemoteVerdict};
use facegate_cache::{Verification, VerifiedEmbeddingsCache};
use facegate_runtime::{
    AccessDecision, BackoffStrategy, Embedding, IdentityRecord, SharedState, Stage, TickControl,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Confidence reported for a remote grant that carries no accuracy
const FULL_CONFIDENCE: f32 = 100.0;

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Minimum time a decision stays published after an evaluation
    pub dwell: Duration,
    /// Name stored and shown when the authority grants without one
    pub fallback_name: String,
    /// First hold after a remote failure
    pub backoff_base: Duration,
    /// Cap on the hold after repeated remote failures
    pub backoff_max: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            dwell: Duration::from_secs(1),
            fallback_name: "Unknown".to_string(),
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(10),
        }
    }
}

/// Per-outcome counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub remote_granted: u64,
    pub remote_denied: u64,
    pub remote_errors: u64,
}

/// Read side of a worker's counters, usable after the worker moved to its thread
#[derive(Debug, Clone, Default)]
pub struct StatsHandle {
    inner: Arc<Mutex<ValidationStats>>,
}

impl StatsHandle {
    pub fn snapshot(&self) -> ValidationStats {
        *self.inner.lock()
    }

    fn update(&self, f: impl FnOnce(&mut ValidationStats)) {
        let mut stats = self.inner.lock();
        f(&mut *stats);
    }
}

pub struct ValidationWorker {
    state: SharedState,
    cache: Arc<VerifiedEmbeddingsCache>,
    remote: Arc<dyn RemoteValidator>,
    settings: WorkerSettings,
    backoff: BackoffStrategy,
    stats: StatsHandle,
    last_decision: AccessDecision,
}

impl ValidationWorker {
    pub fn new(
        state: SharedState,
        cache: Arc<VerifiedEmbeddingsCache>,
        remote: Arc<dyn RemoteValidator>,
        settings: WorkerSettings,
    ) -> Self {
        let backoff = BackoffStrategy::exponential(settings.backoff_base, settings.backoff_max);
        Self {
            state,
            cache,
            remote,
            settings,
            backoff,
            stats: StatsHandle::default(),
            last_decision: AccessDecision::NotFound,
        }
    }

    pub fn stats(&self) -> ValidationStats {
        self.stats.snapshot()
    }

    pub fn stats_handle(&self) -> StatsHandle {
        self.stats.clone()
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Run one evaluation and publish its result
    pub fn process(&mut self) -> TickControl {
        self.stats.update(|s| s.ticks += 1);

        let Some(embedding) = self.state.embedding() else {
            self.stats.update(|s| s.idle_ticks += 1);
            self.publish(AccessDecision::NotFound, None);
            return TickControl::Idle;
        };

        if let Some(identity) = self.check_cache(&embedding) {
            self.publish(AccessDecision::Granted, Some(identity));
            return TickControl::Hold(self.settings.dwell);
        }

        match self.remote.validate(&embedding) {
            Ok(verdict) => {
                self.backoff.reset();
                self.apply_verdict(&embedding, verdict)
            }
            Err(e) => self.remote_failed(e),
        }
    }

    /// Cache lookup; `None` on a miss or a cache failure
    fn check_cache(&self, embedding: &Embedding) -> Option<IdentityRecord> {
        match self.cache.verify(embedding) {
            Ok(Verification::Match(identity)) => {
                self.stats.update(|s| s.cache_hits += 1);
                Some(identity)
            }
            Ok(Verification::NoMatch) => {
                self.stats.update(|s| s.cache_misses += 1);
                None
            }
            Err(e) => {
                self.stats.update(|s| s.cache_errors += 1);
                warn!("[VALIDATION] Cache lookup failed, asking remote authority: {}", e);
                None
            }
        }
    }

    fn apply_verdict(&mut self, observed: &Embedding, verdict: RemoteVerdict) -> TickControl {
        match verdict {
            RemoteVerdict::Verified {
                name,
                confidence,
                canonical,
            } => {
                self.stats.update(|s| s.remote_granted += 1);
                let name = name.unwrap_or_else(|| self.settings.fallback_name.clone());

                let to_store = match canonical {
                    Some(c) if c.dimension() == self.cache.schema().dimension => c,
                    Some(c) => {
                        warn!(
                            "[VALIDATION] Canonical vector has dimension {}, caching observed embedding",
                            c.dimension()
                        );
                        observed.clone()
                    }
                    None => observed.clone(),
                };
                if let Err(e) = self.cache.store(&to_store, &name) {
                    warn!("[VALIDATION] Failed to cache verified embedding for '{}': {}", name, e);
                }

                let identity =
                    IdentityRecord::new(name, confidence.unwrap_or(FULL_CONFIDENCE));
                self.publish(AccessDecision::Granted, Some(identity));
            }
            RemoteVerdict::Rejected => {
                self.stats.update(|s| s.remote_denied += 1);
                self.publish(AccessDecision::Denied, None);
            }
        }
        TickControl::Hold(self.settings.dwell)
    }

    fn remote_failed(&mut self, error: RemoteError) -> TickControl {
        self.stats.update(|s| s.remote_errors += 1);
        let delay = self.backoff.next_backoff();
        warn!(
            "[VALIDATION] Remote authority unavailable (attempt {}): {} - holding {:?}",
            self.backoff.attempt_number(),
            error,
            delay
        );
        self.publish(AccessDecision::Unavailable, None);
        TickControl::Hold(delay)
    }

    fn publish(&mut self, decision: AccessDecision, identity: Option<IdentityRecord>) {
        if decision != self.last_decision {
            match &identity {
                Some(id) => info!(
                    "[VALIDATION] {} -> {} ({}, {:.1}%)",
                    self.last_decision, decision, id.name, id.confidence
                ),
                None => info!("[VALIDATION] {} -> {}", self.last_decision, decision),
            }
            debug!("[VALIDATION] {:?}", self.stats.snapshot());
            self.last_decision = decision;
        }
        self.state.publish_decision(decision, identity);
    }
}

impl Stage for ValidationWorker {
    fn name(&self) -> &str {
        "validation"
    }

    fn tick(&mut self) -> TickControl {
        self.process()
    }

    fn on_stop(&mut self) {
        let s = self.stats.snapshot();
        info!(
            "[VALIDATION] Stopped after {} ticks: {} idle, cache {} hit / {} miss / {} error, remote {} granted / {} denied / {} error",
            s.ticks,
            s.idle_ticks,
            s.cache_hits,
            s.cache_misses,
            s.cache_errors,
            s.remote_granted,
            s.remote_denied,
            s.remote_errors
        );
    }
}
