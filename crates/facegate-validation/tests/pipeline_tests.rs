// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Validation worker against the in-memory cache and scripted remote authorities

use facegate_cache::{cache_key, CacheSettings, MemoryAnnStore, VerifiedEmbeddingsCache};
use facegate_runtime::{
    spawn, AccessDecision, Embedding, Pacer, SharedState, StopSignal, TickControl,
    EMBEDDING_DIMENSIONS,
};
use facegate_validation::{
    RemoteError, RemoteValidator, RemoteVerdict, ValidationWorker, WorkerSettings,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Remote authority that replays a fixed answer and counts calls
struct CountingRemote {
    reply: Mutex<Result<RemoteVerdict, RemoteError>>,
    calls: AtomicUsize,
}

impl CountingRemote {
    fn new(reply: Result<RemoteVerdict, RemoteError>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_reply(&self, reply: Result<RemoteVerdict, RemoteError>) {
        *self.reply.lock() = reply;
    }
}

impl RemoteValidator for CountingRemote {
    fn validate(&self, _embedding: &Embedding) -> Result<RemoteVerdict, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().clone()
    }
}

struct Fixture {
    state: SharedState,
    store: Arc<MemoryAnnStore>,
    cache: Arc<VerifiedEmbeddingsCache>,
    remote: Arc<CountingRemote>,
    worker: ValidationWorker,
}

fn fixture(reply: Result<RemoteVerdict, RemoteError>) -> Fixture {
    let store = Arc::new(MemoryAnnStore::new());
    let cache = Arc::new(VerifiedEmbeddingsCache::new(store.clone(), CacheSettings::default()));
    cache.ensure_index().unwrap();
    let state = SharedState::new();
    let remote = CountingRemote::new(reply);
    let worker = ValidationWorker::new(
        state.clone(),
        cache.clone(),
        remote.clone(),
        WorkerSettings::default(),
    );
    Fixture {
        state,
        store,
        cache,
        remote,
        worker,
    }
}

fn embedding(seed: f32) -> Embedding {
    Embedding::new(
        (0..EMBEDDING_DIMENSIONS)
            .map(|i| ((i as f32 + 1.0) * seed).sin())
            .collect(),
    )
}

#[test]
fn no_embedding_publishes_not_found() {
    let mut f = fixture(Ok(RemoteVerdict::Rejected));
    f.state.publish_decision(AccessDecision::Denied, None);

    assert_eq!(f.worker.process(), TickControl::Idle);
    let snapshot = f.state.read_snapshot();
    assert_eq!(snapshot.decision, AccessDecision::NotFound);
    assert!(snapshot.identity.is_none());
    assert_eq!(f.remote.calls(), 0);
}

#[test]
fn cache_hit_skips_remote() {
    let mut f = fixture(Ok(RemoteVerdict::Rejected));
    let probe = embedding(0.7);
    f.cache.store(&probe, "Ada Lovelace").unwrap();
    f.state.publish_embedding(probe);

    assert_eq!(f.worker.process(), TickControl::Hold(Duration::from_secs(1)));
    assert_eq!(f.remote.calls(), 0);

    let snapshot = f.state.read_snapshot();
    assert_eq!(snapshot.decision, AccessDecision::Granted);
    let identity = snapshot.identity.unwrap();
    assert_eq!(identity.name, "Ada Lovelace");
    assert!(identity.confidence > 99.9);
    assert_eq!(f.worker.stats().cache_hits, 1);
}

#[test]
fn remote_grant_populates_cache_under_canonical_hash() {
    let canonical = embedding(0.3);
    let mut f = fixture(Ok(RemoteVerdict::Verified {
        name: Some("Grace Hopper".to_string()),
        confidence: Some(92.5),
        canonical: Some(canonical.clone()),
    }));
    let observed = Embedding::new(canonical.as_slice().iter().map(|v| v + 0.01).collect());
    f.state.publish_embedding(observed.clone());

    f.worker.process();

    let snapshot = f.state.read_snapshot();
    assert_eq!(snapshot.decision, AccessDecision::Granted);
    let identity = snapshot.identity.unwrap();
    assert_eq!(identity.name, "Grace Hopper");
    assert_eq!(identity.confidence, 92.5);

    assert!(f.store.contains_key(&cache_key(canonical.as_slice())));
    assert!(!f.store.contains_key(&cache_key(observed.as_slice())));

    // Second sighting is answered locally
    f.worker.process();
    assert_eq!(f.remote.calls(), 1);
    assert_eq!(f.worker.stats().cache_hits, 1);
}

#[test]
fn remote_rejection_publishes_denied() {
    let mut f = fixture(Ok(RemoteVerdict::Rejected));
    f.state.publish_embedding(embedding(1.1));

    assert_eq!(f.worker.process(), TickControl::Hold(Duration::from_secs(1)));
    let snapshot = f.state.read_snapshot();
    assert_eq!(snapshot.decision, AccessDecision::Denied);
    assert!(snapshot.identity.is_none());
    assert!(f.cache.is_empty().unwrap());
}

#[test]
fn remote_failure_publishes_unavailable_with_backoff() {
    let mut f = fixture(Err(RemoteError::Transport("connection refused".to_string())));
    f.state.publish_embedding(embedding(0.9));

    assert_eq!(f.worker.process(), TickControl::Hold(Duration::from_millis(500)));
    assert_eq!(f.state.read_snapshot().decision, AccessDecision::Unavailable);
    assert_eq!(f.worker.process(), TickControl::Hold(Duration::from_secs(1)));
    assert!(f.cache.is_empty().unwrap());

    f.remote.set_reply(Ok(RemoteVerdict::Verified {
        name: None,
        confidence: None,
        canonical: None,
    }));
    f.worker.process();
    let snapshot = f.state.read_snapshot();
    assert_eq!(snapshot.decision, AccessDecision::Granted);
    assert_eq!(snapshot.identity.unwrap().name, "Unknown");
    assert_eq!(f.worker.stats().remote_errors, 2);
}

#[test]
fn cache_failure_falls_back_to_remote() {
    let mut f = fixture(Ok(RemoteVerdict::Verified {
        name: Some("Ada".to_string()),
        confidence: None,
        canonical: None,
    }));
    f.store.set_reachable(false);
    f.state.publish_embedding(embedding(0.5));

    f.worker.process();
    assert_eq!(f.remote.calls(), 1);
    assert_eq!(f.state.read_snapshot().decision, AccessDecision::Granted);
    assert_eq!(f.worker.stats().cache_errors, 1);
}

#[test]
fn worker_stage_runs_until_stopped() {
    let f = fixture(Ok(RemoteVerdict::Rejected));
    let stats = f.worker.stats_handle();
    f.state.publish_embedding(embedding(0.2));

    let stop = StopSignal::new();
    let handle = spawn(f.worker, Pacer::from_hz(100.0).unwrap(), stop.clone()).unwrap();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(f.state.read_snapshot().decision, AccessDecision::Denied);

    stop.trigger();
    let iterations = handle.join().unwrap();
    assert!(iterations >= 1);
    assert_eq!(stats.snapshot().ticks, iterations);
}
