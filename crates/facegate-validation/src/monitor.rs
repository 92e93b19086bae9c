// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Headless decision display
//!
//! Reads snapshots at the display rate and logs what an overlay would show.

use facegate_runtime::{AccessDecision, SharedState, Stage, StateSnapshot, TickControl};
use tracing::info;

/// Status an overlay would show for `snapshot`
///
/// With `require_processed_frame`, a decision is only shown over a frame the
/// detector has annotated; otherwise the status is `NotFound`.
pub fn displayed_status(snapshot: &StateSnapshot, require_processed_frame: bool) -> AccessDecision {
    if require_processed_frame && snapshot.processed_frame.is_none() {
        AccessDecision::NotFound
    } else {
        snapshot.decision
    }
}

pub struct DecisionMonitor {
    state: SharedState,
    require_processed_frame: bool,
    last_version: Option<u64>,
    last_shown: Option<(AccessDecision, Option<String>)>,
    transitions: u64,
}

impl DecisionMonitor {
    pub fn new(state: SharedState, require_processed_frame: bool) -> Self {
        Self {
            state,
            require_processed_frame,
            last_version: None,
            last_shown: None,
            transitions: 0,
        }
    }

    /// Number of displayed-status changes seen so far
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Currently displayed status, if any snapshot has been observed
    pub fn current(&self) -> Option<AccessDecision> {
        self.last_shown.as_ref().map(|(decision, _)| *decision)
    }

    /// Observe the latest snapshot; returns true when the displayed status changed
    pub fn observe(&mut self) -> bool {
        let snapshot = self.state.read_snapshot();
        if self.last_version == Some(snapshot.version) {
            return false;
        }
        self.last_version = Some(snapshot.version);

        let status = displayed_status(&snapshot, self.require_processed_frame);
        let name = match status {
            AccessDecision::Granted => snapshot.identity.as_ref().map(|id| id.name.clone()),
            _ => None,
        };
        let shown = (status, name);
        if self.last_shown.as_ref() == Some(&shown) {
            return false;
        }

        match (&shown.1, snapshot.identity.as_ref()) {
            (Some(name), Some(id)) => {
                info!("[MONITOR] {} - {} ({:.1}%)", status, name, id.confidence)
            }
            _ => info!("[MONITOR] {}", status),
        }
        self.last_shown = Some(shown);
        self.transitions += 1;
        true
    }
}

impl Stage for DecisionMonitor {
    fn name(&self) -> &str {
        "monitor"
    }

    fn tick(&mut self) -> TickControl {
        self.observe();
        TickControl::Continue
    }

    fn on_stop(&mut self) {
        info!("[MONITOR] Stopped after {} status change(s)", self.transitions);
    }
}
