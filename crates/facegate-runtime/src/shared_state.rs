// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Shared Pipeline State
//!
//! The only channel between stages. A single `parking_lot::Mutex` guards every
//! slot; it is held just long enough to copy or overwrite slots and never
//! across a cache or network call.
//!
//! | slot              | writer               | reader     |
//! |-------------------|----------------------|------------|
//! | `frame`           | capture              | render     |
//! | `processed_frame` | detection            | render     |
//! | `embedding`       | embedding extraction | validation |
//! | `decision`        | validation           | render     |
//! | `identity`        | validation           | render     |
//!
//! Decision and identity travel as one value in [`StateUpdate`], so a reader can
//! never see one without the other.

use crate::types::{AccessDecision, Embedding, Frame, IdentityRecord};
use parking_lot::Mutex;
use std::sync::Arc;

/// Consistent copy of every slot, taken under one lock acquisition
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    pub frame: Option<Arc<Frame>>,
    pub processed_frame: Option<Arc<Frame>>,
    pub embedding: Option<Embedding>,
    pub decision: AccessDecision,
    pub identity: Option<IdentityRecord>,
    /// Incremented on every applied write
    pub version: u64,
}

/// Named subset of slots to overwrite atomically
///
/// Outer `None` leaves a slot untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    frame: Option<Option<Arc<Frame>>>,
    processed_frame: Option<Option<Arc<Frame>>>,
    embedding: Option<Option<Embedding>>,
    decision: Option<(AccessDecision, Option<IdentityRecord>)>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(mut self, frame: Option<Arc<Frame>>) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn processed_frame(mut self, frame: Option<Arc<Frame>>) -> Self {
        self.processed_frame = Some(frame);
        self
    }

    pub fn embedding(mut self, embedding: Option<Embedding>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn decision(mut self, decision: AccessDecision, identity: Option<IdentityRecord>) -> Self {
        self.decision = Some((decision, identity));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
            && self.processed_frame.is_none()
            && self.embedding.is_none()
            && self.decision.is_none()
    }
}

/// Cloneable handle to the shared slots
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    slots: Arc<Mutex<StateSnapshot>>,
}

impl SharedState {
    /// All slots unset, decision `NotFound`
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `update` atomically and return the resulting version
    ///
    /// An empty update changes nothing and does not bump the version.
    pub fn write(&self, update: StateUpdate) -> u64 {
        let mut slots = self.slots.lock();
        if update.is_empty() {
            return slots.version;
        }

        if let Some(frame) = update.frame {
            slots.frame = frame;
        }
        if let Some(frame) = update.processed_frame {
            slots.processed_frame = frame;
        }
        if let Some(embedding) = update.embedding {
            slots.embedding = embedding;
        }
        if let Some((decision, identity)) = update.decision {
            slots.decision = decision;
            slots.identity = identity;
        }
        slots.version += 1;
        slots.version
    }

    /// Copy every slot under the lock
    pub fn read_snapshot(&self) -> StateSnapshot {
        self.slots.lock().clone()
    }

    /// Copy of the embedding slot only
    pub fn embedding(&self) -> Option<Embedding> {
        self.slots.lock().embedding.clone()
    }

    pub fn publish_frame(&self, frame: Frame) -> u64 {
        self.write(StateUpdate::new().frame(Some(Arc::new(frame))))
    }

    pub fn publish_processed_frame(&self, frame: Option<Frame>) -> u64 {
        self.write(StateUpdate::new().processed_frame(frame.map(Arc::new)))
    }

    pub fn publish_embedding(&self, embedding: Embedding) -> u64 {
        self.write(StateUpdate::new().embedding(Some(embedding)))
    }

    pub fn clear_embedding(&self) -> u64 {
        self.write(StateUpdate::new().embedding(None))
    }

    pub fn publish_decision(&self, decision: AccessDecision, identity: Option<IdentityRecord>) -> u64 {
        self.write(StateUpdate::new().decision(decision, identity))
    }
}
