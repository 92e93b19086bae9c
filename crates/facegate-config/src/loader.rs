// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, FacegateConfig, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the facegate configuration file
///
/// Search order:
/// 1. `FACEGATE_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("FACEGATE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by FACEGATE_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet FACEGATE_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<FacegateConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: FacegateConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `FACEGATE_FPS` -> `pipeline.fps`
/// - `FACEGATE_CACHE_BACKEND` -> `cache.backend`
/// - `FACEGATE_CACHE_HOST` -> `cache.host`
/// - `FACEGATE_CACHE_PORT` -> `cache.port`
/// - `FACEGATE_REMOTE_URL` -> `remote.base_url`
/// - `FACEGATE_REMOTE_TIMEOUT_MS` -> `remote.timeout_ms`
/// - `FACEGATE_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut FacegateConfig) {
    if let Ok(value) = env::var("FACEGATE_FPS") {
        if let Ok(fps) = value.parse::<f64>() {
            config.pipeline.fps = fps;
        }
    }

    if let Ok(value) = env::var("FACEGATE_CACHE_BACKEND") {
        config.cache.backend = value.to_lowercase();
    }
    if let Ok(value) = env::var("FACEGATE_CACHE_HOST") {
        config.cache.host = value;
    }
    if let Ok(value) = env::var("FACEGATE_CACHE_PORT") {
        if let Ok(port) = value.parse::<u16>() {
            config.cache.port = port;
        }
    }

    if let Ok(value) = env::var("FACEGATE_REMOTE_URL") {
        config.remote.base_url = value;
    }
    if let Ok(value) = env::var("FACEGATE_REMOTE_TIMEOUT_MS") {
        if let Ok(timeout) = value.parse::<u64>() {
            config.remote.timeout_ms = timeout;
        }
    }

    if let Ok(value) = env::var("FACEGATE_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// Keys: `fps`, `cache_backend`, `cache_host`, `cache_port`, `remote_url`,
/// `remote_timeout_ms`, `log_level`.
pub fn apply_cli_overrides(config: &mut FacegateConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("fps") {
        if let Ok(fps) = value.parse::<f64>() {
            config.pipeline.fps = fps;
        }
    }

    if let Some(value) = cli_args.get("cache_backend") {
        config.cache.backend = value.to_lowercase();
    }
    if let Some(value) = cli_args.get("cache_host") {
        config.cache.host = value.clone();
    }
    if let Some(value) = cli_args.get("cache_port") {
        if let Ok(port) = value.parse::<u16>() {
            config.cache.port = port;
        }
    }

    if let Some(value) = cli_args.get("remote_url") {
        config.remote.base_url = value.clone();
    }
    if let Some(value) = cli_args.get("remote_timeout_ms") {
        if let Ok(timeout) = value.parse::<u64>() {
            config.remote.timeout_ms = timeout;
        }
    }

    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}
