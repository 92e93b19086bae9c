// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pipeline assembly from configuration

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;

use facegate_cache::{AnnStore, CacheSettings, MemoryAnnStore, VerifiedEmbeddingsCache};
use facegate_config::{CacheConfig, FacegateConfig, RemoteConfig};
use facegate_runtime::{spawn, Embedding, Pacer, SharedState, StageSet, StopSignal};
use facegate_validation::{
    DecisionMonitor, EmbeddingReplay, HttpRemoteValidator, RemoteValidator, ValidationWorker,
    WorkerSettings,
};

/// Backing store selected by `cache.backend`
pub fn open_store(config: &CacheConfig) -> Result<Arc<dyn AnnStore>> {
    match config.backend.as_str() {
        "memory" => {
            info!("[CACHE] Using in-process store");
            Ok(Arc::new(MemoryAnnStore::new()))
        }
        #[cfg(feature = "redis-store")]
        "redis" => {
            use facegate_cache::{RedisAnnStore, RedisSettings};

            let settings = RedisSettings {
                host: config.host.clone(),
                port: config.port,
                db: config.db,
                password: config.password.clone(),
                index_name: config.index_name.clone(),
                connect_timeout: config.connect_timeout(),
            };
            info!("[CACHE] Using Redis store at {}:{}/{}", settings.host, settings.port, settings.db);
            Ok(Arc::new(RedisAnnStore::new(&settings)?))
        }
        #[cfg(not(feature = "redis-store"))]
        "redis" => bail!("cache.backend = \"redis\" requires the redis-store feature"),
        other => bail!("Unknown cache backend '{}'", other),
    }
}

pub fn cache_settings(config: &CacheConfig) -> CacheSettings {
    CacheSettings {
        index_name: config.index_name.clone(),
        dimension: config.dimension,
        ttl: config.ttl(),
        connect_retry_interval: config.connect_retry_interval(),
    }
}

/// Open the store, wait for it, and make sure the index exists
pub fn connect_cache(config: &CacheConfig, stop: &StopSignal) -> Result<Arc<VerifiedEmbeddingsCache>> {
    let store = open_store(config)?;
    let cache = VerifiedEmbeddingsCache::new(store, cache_settings(config));
    cache.connect(stop).context("Waiting for cache store")?;
    cache.ensure_index().context("Creating cache index")?;
    Ok(Arc::new(cache))
}

pub fn http_remote(config: &RemoteConfig) -> Result<Arc<dyn RemoteValidator>> {
    let remote = HttpRemoteValidator::new(&config.base_url, config.timeout())?;
    info!("[REMOTE] Validating against {}", remote.endpoint());
    Ok(Arc::new(remote))
}

pub fn worker_settings(config: &FacegateConfig) -> WorkerSettings {
    WorkerSettings {
        dwell: config.pipeline.dwell(),
        fallback_name: config.remote.fallback_name.clone(),
        backoff_base: config.remote.backoff_base(),
        backoff_max: config.remote.backoff_max(),
    }
}

/// Spawn the validation and monitor stages, plus a replay feed if given
pub fn start_pipeline(
    config: &FacegateConfig,
    state: SharedState,
    cache: Arc<VerifiedEmbeddingsCache>,
    remote: Arc<dyn RemoteValidator>,
    replay: Option<Vec<Option<Embedding>>>,
    stop: &StopSignal,
) -> Result<StageSet> {
    let pacer = Pacer::from_hz(config.pipeline.fps)?
        .with_idle_interval(config.pipeline.idle_interval());

    let mut stages = StageSet::new();

    let worker = ValidationWorker::new(state.clone(), cache, remote, worker_settings(config));
    stages.push(spawn(worker, pacer, stop.clone())?);

    let monitor = DecisionMonitor::new(state.clone(), config.pipeline.require_processed_frame);
    stages.push(spawn(monitor, pacer, stop.clone())?);

    if let Some(items) = replay {
        let replay = EmbeddingReplay::new(state, items).looping(true);
        stages.push(spawn(replay, pacer, stop.clone())?);
    }

    info!(
        "✓ Started {} stage(s) at {:.1} Hz",
        stages.len(),
        config.pipeline.fps
    );
    Ok(stages)
}
