// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cooperative stop signal shared by every stage

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single stop flag observed by every pacer at the top of each iteration
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown of every loop holding a clone of this signal
    pub fn trigger(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let stop = StopSignal::new();
        let observer = stop.clone();
        assert!(!observer.is_triggered());
        stop.trigger();
        assert!(observer.is_triggered());
    }
}
