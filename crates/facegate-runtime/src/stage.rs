// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Stage threads
//!
//! Every pipeline stage runs on its own named OS thread driven by a [`Pacer`].
//! Spawning is explicit and returns a joinable handle; stopping goes through
//! the shared [`StopSignal`].

use crate::{Pacer, Result, RuntimeError, StopSignal, TickControl};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// One independently paced pipeline stage
pub trait Stage: Send + 'static {
    /// Short stage name used for the thread name and logs
    fn name(&self) -> &str;

    /// One iteration of the stage body
    fn tick(&mut self) -> TickControl;

    /// Called once on the stage thread after the loop exits
    fn on_stop(&mut self) {}
}

/// Handle to a running stage thread
#[derive(Debug)]
pub struct StageHandle {
    name: String,
    thread: JoinHandle<u64>,
}

impl StageHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the stage to exit and return its iteration count
    pub fn join(self) -> Result<u64> {
        self.thread
            .join()
            .map_err(|_| RuntimeError::StagePanicked(self.name))
    }
}

/// Start `stage` on a dedicated thread
pub fn spawn<S: Stage>(mut stage: S, pacer: Pacer, stop: StopSignal) -> Result<StageHandle> {
    let name = stage.name().to_string();
    let thread_name = format!("facegate-{}", name);
    let stage_name = name.clone();

    let thread = thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            debug!(
                "[STAGE] {} started ({:.2}ms period)",
                stage_name,
                pacer.period().as_secs_f64() * 1000.0
            );
            let iterations = pacer.run(&stop, || stage.tick());
            stage.on_stop();
            debug!("[STAGE] {} stopped after {} iterations", stage_name, iterations);
            iterations
        })
        .map_err(|source| RuntimeError::Spawn {
            stage: name.clone(),
            source,
        })?;

    Ok(StageHandle { name, thread })
}

/// Collection of running stages joined together on shutdown
#[derive(Debug, Default)]
pub struct StageSet {
    handles: Vec<StageHandle>,
}

impl StageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: StageHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Join every stage; returns how many panicked
    pub fn join_all(self) -> usize {
        let mut panicked = 0;
        for handle in self.handles {
            let name = handle.name().to_string();
            match handle.join() {
                Ok(iterations) => info!("[STAGE] ✓ {} joined ({} iterations)", name, iterations),
                Err(e) => {
                    warn!("[STAGE] ✗ {}", e);
                    panicked += 1;
                }
            }
        }
        panicked
    }
}
