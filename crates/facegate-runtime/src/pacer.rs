// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Fixed-Rate Pacer
//!
//! Drives a stage body at a target frequency regardless of how long each
//! iteration takes.
//!
//! ## Design
//! - Sleep `max(0, period - elapsed)` after every iteration, so the call rate
//!   never exceeds `1 / period` but may fall below it under load
//! - Stop flag checked at the top of every iteration (at most one extra
//!   iteration after it is raised)
//! - Sleeps are chunked (50ms) and re-check the stop flag between chunks, so a
//!   long dwell does not delay shutdown

use crate::{Result, RuntimeError, StopSignal};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Short wait used when a stage has nothing to do
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(10);

/// Maximum single sleep before the stop flag is re-checked
const SLEEP_CHUNK: Duration = Duration::from_millis(50);

/// Overrun beyond the period that gets logged
const OVERRUN_WARN_THRESHOLD: Duration = Duration::from_millis(50);

/// What a stage body asks the pacer to do after an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Sleep for the remainder of the period
    Continue,
    /// Nothing was pending; wait `min(period, idle_interval)` only
    Idle,
    /// Keep the published result visible for at least this long
    Hold(Duration),
    /// Leave the loop
    Stop,
}

/// Reusable fixed-rate loop driver
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    period: Duration,
    idle_interval: Duration,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }

    /// Pacer targeting `hz` iterations per second
    pub fn from_hz(hz: f64) -> Result<Self> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(RuntimeError::InvalidRate(hz));
        }
        let period =
            Duration::try_from_secs_f64(1.0 / hz).map_err(|_| RuntimeError::InvalidRate(hz))?;
        Ok(Self::new(period))
    }

    pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn idle_interval(&self) -> Duration {
        self.idle_interval
    }

    /// Run `body` until `stop` is triggered or the body returns [`TickControl::Stop`]
    ///
    /// Returns the number of iterations executed.
    pub fn run<F>(&self, stop: &StopSignal, mut body: F) -> u64
    where
        F: FnMut() -> TickControl,
    {
        let mut iterations: u64 = 0;

        while !stop.is_triggered() {
            let iteration_start = Instant::now();
            let control = body();
            iterations += 1;

            if control == TickControl::Stop {
                trace!("[PACER] Body requested stop after {} iterations", iterations);
                break;
            }

            let elapsed = iteration_start.elapsed();
            if elapsed > self.period + OVERRUN_WARN_THRESHOLD {
                warn!(
                    "[PACER] ⚠️ Iteration overshoot: {:.2}ms past {:.2}ms period",
                    (elapsed - self.period).as_secs_f64() * 1000.0,
                    self.period.as_secs_f64() * 1000.0
                );
            }

            sleep_responsive(self.sleep_after(control, elapsed), stop);
        }

        iterations
    }

    /// Time to sleep after an iteration that took `elapsed`
    pub fn sleep_after(&self, control: TickControl, elapsed: Duration) -> Duration {
        let remaining = self.period.saturating_sub(elapsed);
        match control {
            TickControl::Continue => remaining,
            TickControl::Idle => self.period.min(self.idle_interval),
            TickControl::Hold(dwell) => dwell.max(remaining),
            TickControl::Stop => Duration::ZERO,
        }
    }
}

/// Sleep in chunks, returning early once `stop` is triggered
pub fn sleep_responsive(duration: Duration, stop: &StopSignal) {
    let deadline = Instant::now() + duration;
    loop {
        let now = Instant::now();
        if now >= deadline || stop.is_triggered() {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_CHUNK));
    }
}
