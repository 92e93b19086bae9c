// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Retry delays: fixed interval or exponential backoff

use std::time::Duration;

/// Retry strategy shared by the cache connection barrier and the remote validator
#[derive(Debug, Clone)]
pub struct BackoffStrategy {
    /// First delay
    base: Duration,

    /// Upper bound for any delay
    max: Duration,

    /// Double the delay after every attempt
    exponential: bool,

    /// Current attempt number
    current_attempt: u32,
}

impl BackoffStrategy {
    /// Same delay every attempt
    pub fn fixed(interval: Duration) -> Self {
        Self {
            base: interval,
            max: interval,
            exponential: false,
            current_attempt: 0,
        }
    }

    /// `base * 2^(attempt - 1)`, capped at `max`
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            exponential: true,
            current_attempt: 0,
        }
    }

    /// Delay before the next attempt; retries are never exhausted
    pub fn next_backoff(&mut self) -> Duration {
        self.current_attempt = self.current_attempt.saturating_add(1);

        if !self.exponential || self.current_attempt == 1 {
            return self.base;
        }

        let exp = 2u32.saturating_pow(self.current_attempt - 1);
        self.base.saturating_mul(exp).min(self.max)
    }

    /// Reset after a successful attempt
    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }

    pub fn attempt_number(&self) -> u32 {
        self.current_attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let mut strategy =
            BackoffStrategy::exponential(Duration::from_millis(100), Duration::from_secs(60));

        assert_eq!(strategy.next_backoff(), Duration::from_millis(100));
        assert_eq!(strategy.next_backoff(), Duration::from_millis(200));
        assert_eq!(strategy.next_backoff(), Duration::from_millis(400));
        assert_eq!(strategy.next_backoff(), Duration::from_millis(800));
        assert_eq!(strategy.next_backoff(), Duration::from_millis(1600));
        assert_eq!(strategy.attempt_number(), 5);
    }

    #[test]
    fn test_backoff_capped() {
        let mut strategy =
            BackoffStrategy::exponential(Duration::from_millis(500), Duration::from_secs(10));
        for _ in 0..40 {
            strategy.next_backoff();
        }
        assert_eq!(strategy.next_backoff(), Duration::from_secs(10));
    }

    #[test]
    fn test_fixed_interval_is_unbounded() {
        let mut strategy = BackoffStrategy::fixed(Duration::from_secs(1));
        for _ in 0..100 {
            assert_eq!(strategy.next_backoff(), Duration::from_secs(1));
        }
        assert_eq!(strategy.attempt_number(), 100);
    }

    #[test]
    fn test_reset() {
        let mut strategy =
            BackoffStrategy::exponential(Duration::from_millis(100), Duration::from_secs(1));
        strategy.next_backoff();
        strategy.next_backoff();
        assert_eq!(strategy.attempt_number(), 2);

        strategy.reset();
        assert_eq!(strategy.attempt_number(), 0);
        assert_eq!(strategy.next_backoff(), Duration::from_millis(100));
    }
}
