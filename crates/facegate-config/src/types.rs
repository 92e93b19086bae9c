// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `facegate_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Backends accepted by `cache.backend`
pub const CACHE_BACKENDS: &[&str] = &["redis", "memory"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FacegateConfig {
    pub pipeline: PipelineConfig,
    pub cache: CacheConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Stage pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Iterations per second for every stage
    pub fps: f64,
    /// How long a decision stays published after an evaluation
    pub dwell_ms: u64,
    /// Wait used when there is no embedding to evaluate
    pub idle_ms: u64,
    /// Only display decisions over an annotated frame
    pub require_processed_frame: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            dwell_ms: 1000,
            idle_ms: 10,
            require_processed_frame: false,
        }
    }
}

impl PipelineConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}

/// Verified embeddings cache and its backing store
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `redis` or `memory`
    pub backend: String,
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
    pub index_name: String,
    pub dimension: usize,
    pub ttl_secs: u64,
    pub connect_retry_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "redis".to_string(),
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
            index_name: "embeddings_index".to_string(),
            dimension: 512,
            ttl_secs: 3600,
            connect_retry_ms: 1000,
            connect_timeout_ms: 2000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn connect_retry_interval(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Remote validation authority
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Identity name used when a grant carries none
    pub fallback_name: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            timeout_ms: 2000,
            backoff_base_ms: 500,
            backoff_max_ms: 10_000,
            fallback_name: "Unknown".to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub file_logging: bool,
    /// Days of run folders kept when file logging is on
    pub retention_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("./logs"),
            file_logging: false,
            retention_days: 7,
        }
    }
}
