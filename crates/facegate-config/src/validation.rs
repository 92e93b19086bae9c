// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every check runs and all problems are reported together.

use crate::{ConfigError, ConfigResult, FacegateConfig, CACHE_BACKENDS};

/// Highest accepted stage rate
pub const MAX_FPS: f64 = 240.0;

/// Longest accepted cache entry lifetime (30 days)
pub const MAX_TTL_SECS: u64 = 30 * 24 * 3600;

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidPort { field: String },
    OutOfRange { field: String, value: String, expected: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPort { field } => write!(f, "{} must not be 0", field),
            Self::OutOfRange {
                field,
                value,
                expected,
            } => write!(f, "{} = {} is out of range (expected {})", field, value, expected),
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &FacegateConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_pipeline(config, &mut errors);
    validate_cache(config, &mut errors);
    validate_remote(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_pipeline(config: &FacegateConfig, errors: &mut Vec<ConfigValidationError>) {
    let fps = config.pipeline.fps;
    if !fps.is_finite() || fps <= 0.0 || fps > MAX_FPS {
        errors.push(ConfigValidationError::OutOfRange {
            field: "pipeline.fps".to_string(),
            value: fps.to_string(),
            expected: format!("0 < fps <= {}", MAX_FPS),
        });
    }
}

fn validate_cache(config: &FacegateConfig, errors: &mut Vec<ConfigValidationError>) {
    let cache = &config.cache;

    if !CACHE_BACKENDS.contains(&cache.backend.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "cache.backend".to_string(),
            reason: format!("'{}' is not one of {:?}", cache.backend, CACHE_BACKENDS),
        });
    }
    if cache.port == 0 {
        errors.push(ConfigValidationError::InvalidPort {
            field: "cache.port".to_string(),
        });
    }
    if cache.dimension == 0 {
        errors.push(ConfigValidationError::OutOfRange {
            field: "cache.dimension".to_string(),
            value: "0".to_string(),
            expected: "> 0".to_string(),
        });
    }
    if cache.ttl_secs == 0 || cache.ttl_secs > MAX_TTL_SECS {
        errors.push(ConfigValidationError::OutOfRange {
            field: "cache.ttl_secs".to_string(),
            value: cache.ttl_secs.to_string(),
            expected: format!("0 < ttl_secs <= {}", MAX_TTL_SECS),
        });
    }
    if cache.index_name.trim().is_empty() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "cache.index_name".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
}

fn validate_remote(config: &FacegateConfig, errors: &mut Vec<ConfigValidationError>) {
    let remote = &config.remote;

    if !(remote.base_url.starts_with("http://") || remote.base_url.starts_with("https://")) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "remote.base_url".to_string(),
            reason: format!("'{}' must use http:// or https://", remote.base_url),
        });
    }
    if remote.backoff_base_ms > remote.backoff_max_ms {
        errors.push(ConfigValidationError::InvalidValue {
            field: "remote.backoff_base_ms".to_string(),
            reason: format!(
                "{} exceeds remote.backoff_max_ms ({})",
                remote.backoff_base_ms, remote.backoff_max_ms
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_bounds() {
        let mut config = FacegateConfig::default();
        for bad in [0.0, -1.0, 241.0, f64::NAN] {
            config.pipeline.fps = bad;
            assert!(validate_config(&config).is_err(), "fps {} accepted", bad);
        }
        config.pipeline.fps = 240.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_all_errors_reported_together() {
        let mut config = FacegateConfig::default();
        config.cache.backend = "sqlite".to_string();
        config.cache.port = 0;
        config.cache.ttl_secs = 0;
        config.remote.base_url = "ftp://auth".to_string();

        let Err(ConfigError::ValidationError(message)) = validate_config(&config) else {
            panic!("expected validation error");
        };
        assert!(message.contains("cache.backend"));
        assert!(message.contains("cache.port"));
        assert!(message.contains("cache.ttl_secs"));
        assert!(message.contains("remote.base_url"));
    }

    #[test]
    fn test_ttl_bounds() {
        let mut config = FacegateConfig::default();
        config.cache.ttl_secs = u64::MAX;
        assert!(validate_config(&config).is_err());
        config.cache.ttl_secs = MAX_TTL_SECS + 1;
        assert!(validate_config(&config).is_err());
        config.cache.ttl_secs = MAX_TTL_SECS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_memory_backend_accepted() {
        let mut config = FacegateConfig::default();
        config.cache.backend = "memory".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
