// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

use facegate::app;
use facegate::config::{load_config, validate_config, ConfigError, FacegateConfig};
use facegate::observability::{debug_flags_help, init_logging, split_debug_args, LoggingOptions};
use facegate::runtime::{SharedState, StopSignal};
use facegate::validation::load_replay_file;

/// facegate - cache-first face embedding access control
#[derive(Parser, Debug)]
#[command(name = "facegate", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Path to facegate_configuration.toml (searched for when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stage rate in Hz
    #[arg(long)]
    fps: Option<f64>,

    /// Cache backend: redis or memory
    #[arg(long)]
    cache_backend: Option<String>,

    /// Cache store host
    #[arg(long)]
    cache_host: Option<String>,

    /// Cache store port
    #[arg(long)]
    cache_port: Option<u16>,

    /// Remote validation authority base URL
    #[arg(long)]
    remote_url: Option<String>,

    /// JSON file of embeddings to replay (array of float arrays or null)
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(fps) = self.fps {
            map.insert("fps".to_string(), fps.to_string());
        }
        if let Some(backend) = &self.cache_backend {
            map.insert("cache_backend".to_string(), backend.clone());
        }
        if let Some(host) = &self.cache_host {
            map.insert("cache_host".to_string(), host.clone());
        }
        if let Some(port) = self.cache_port {
            map.insert("cache_port".to_string(), port.to_string());
        }
        if let Some(url) = &self.remote_url {
            map.insert("remote_url".to_string(), url.clone());
        }
        if self.verbose {
            map.insert("log_level".to_string(), "debug".to_string());
        }
        map
    }
}

/// Config file plus overrides; defaults when no file exists
fn resolve_config(args: &Args) -> Result<(FacegateConfig, Option<String>)> {
    let overrides = args.overrides();
    match load_config(args.config.as_deref(), Some(&overrides)) {
        Ok(config) => Ok((config, None)),
        Err(ConfigError::FileNotFound(detail)) if args.config.is_none() => {
            let mut config = FacegateConfig::default();
            facegate::config::apply_environment_overrides(&mut config);
            facegate::config::apply_cli_overrides(&mut config, &overrides);
            Ok((config, Some(detail)))
        }
        Err(e) => Err(e).context("Loading configuration"),
    }
}

fn main() -> Result<()> {
    let (debug_flags, argv) = split_debug_args(std::env::args());
    let args = Args::parse_from(argv);

    let (config, missing_file) = resolve_config(&args)?;

    let logging = LoggingOptions {
        default_level: config.logging.level.clone(),
        log_dir: config.logging.log_dir.clone(),
        file_logging: config.logging.file_logging,
        retention_days: config.logging.retention_days,
        ..LoggingOptions::default()
    };
    let log_guard = init_logging(&debug_flags, &logging)?;

    print_banner();
    if debug_flags.any_enabled() {
        let crates: Vec<&str> = debug_flags.enabled_crates.iter().map(String::as_str).collect();
        info!("Debug logging enabled for: {}", crates.join(", "));
    }
    if let Some(dir) = log_guard.log_dir() {
        info!("Writing log files to {}", dir.display());
    }
    if let Some(detail) = missing_file {
        warn!("No configuration file found, using defaults");
        tracing::debug!("{}", detail);
    }
    validate_config(&config)?;

    info!("Configuration:");
    info!("  Pipeline: {:.1} Hz, dwell {} ms", config.pipeline.fps, config.pipeline.dwell_ms);
    info!(
        "  Cache:    {} ({}:{}), index '{}', dim {}, ttl {}s",
        config.cache.backend,
        config.cache.host,
        config.cache.port,
        config.cache.index_name,
        config.cache.dimension,
        config.cache.ttl_secs
    );
    info!("  Remote:   {} (timeout {} ms)", config.remote.base_url, config.remote.timeout_ms);

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received...");
        handler_stop.trigger();
    })?;

    let replay = match &args.replay {
        Some(path) => Some(
            load_replay_file(path, config.cache.dimension)
                .with_context(|| format!("Loading replay file {}", path.display()))?,
        ),
        None => None,
    };

    let cache = match app::connect_cache(&config.cache, &stop) {
        Ok(cache) => cache,
        Err(e) if stop.is_triggered() => {
            info!("Stopped before the cache store came up: {:#}", e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let remote = app::http_remote(&config.remote)?;

    let state = SharedState::new();
    let stages = app::start_pipeline(&config, state, cache, remote, replay, &stop)?;
    info!("🔄 Pipeline running (Press Ctrl+C to stop)...");

    let panicked = stages.join_all();
    if panicked > 0 {
        error!("{} stage(s) panicked", panicked);
        anyhow::bail!("{} stage(s) panicked", panicked);
    }

    info!("✓ Shutdown complete");
    Ok(())
}

fn print_banner() {
    info!("╔══════════════════════════════════════╗");
    info!("║  facegate v{:<26}║", facegate::VERSION);
    info!("║  cache-first access control          ║");
    info!("╚══════════════════════════════════════╝");
}
