// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end behaviour of the verified embeddings cache over the in-memory store

use facegate_cache::{
    cache_key, CacheError, CacheSettings, ManualClock, MemoryAnnStore, Verification,
    VerifiedEmbeddingsCache,
};
use facegate_runtime::{Embedding, StopSignal, EMBEDDING_DIMENSIONS};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn padded(head: &[f32]) -> Embedding {
    let mut values = vec![0.0f32; EMBEDDING_DIMENSIONS];
    values[..head.len()].copy_from_slice(head);
    Embedding::new(values)
}

fn cache_with_clock() -> (VerifiedEmbeddingsCache, Arc<MemoryAnnStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(MemoryAnnStore::with_clock(clock.clone()));
    let settings = CacheSettings {
        connect_retry_interval: Duration::from_millis(10),
        ..CacheSettings::default()
    };
    let cache = VerifiedEmbeddingsCache::new(store.clone(), settings);
    cache.ensure_index().unwrap();
    (cache, store, clock)
}

#[test]
fn stored_embedding_verifies_with_full_confidence() {
    let (cache, _, _) = cache_with_clock();
    let embedding = padded(&[0.3, -0.7, 0.1, 0.9]);

    let key = cache.store(&embedding, "Ada Lovelace").unwrap();
    assert_eq!(key, cache_key(embedding.as_slice()));

    match cache.verify(&embedding).unwrap() {
        Verification::Match(identity) => {
            assert_eq!(identity.name, "Ada Lovelace");
            assert!(identity.confidence > 99.99, "confidence {}", identity.confidence);
        }
        Verification::NoMatch => panic!("identical embedding did not match"),
    }
}

#[test]
fn empty_cache_is_a_miss() {
    let (cache, _, _) = cache_with_clock();
    assert_eq!(cache.verify(&padded(&[1.0])).unwrap(), Verification::NoMatch);
}

#[test]
fn similarity_of_exactly_half_does_not_match() {
    let (cache, _, _) = cache_with_clock();
    cache.store(&padded(&[1.0, 1.0, 0.0]), "Boundary").unwrap();

    // cos = 1 / (sqrt(2) * sqrt(2)) = 0.5
    let query = padded(&[1.0, 0.0, 1.0]);
    assert_eq!(cache.verify(&query).unwrap(), Verification::NoMatch);
}

#[test]
fn similarity_just_above_half_matches() {
    let (cache, _, _) = cache_with_clock();
    cache.store(&padded(&[1.0, 0.0]), "Above").unwrap();

    let x = 0.51f32;
    let query = padded(&[x, (1.0 - x * x).sqrt()]);
    let verification = cache.verify(&query).unwrap();
    let identity = verification.identity().expect("0.51 similarity should match");
    assert_eq!(identity.name, "Above");
    assert!((identity.confidence - 51.0).abs() < 0.01);
}

#[test]
fn entries_expire_after_ttl() {
    let (cache, _, clock) = cache_with_clock();
    let embedding = padded(&[0.5, 0.5, 0.5]);
    cache.store(&embedding, "Transient").unwrap();
    assert!(cache.verify(&embedding).unwrap().is_match());

    clock.advance(Duration::from_secs(3599));
    assert!(cache.verify(&embedding).unwrap().is_match());

    clock.advance(Duration::from_secs(1));
    assert!(!cache.verify(&embedding).unwrap().is_match());
    assert_eq!(cache.len().unwrap(), 0);
}

#[test]
fn restoring_refreshes_ttl_without_duplicating() {
    let (cache, store, clock) = cache_with_clock();
    let embedding = padded(&[0.1, 0.2, 0.3]);

    let first = cache.store(&embedding, "Repeat").unwrap();
    clock.advance(Duration::from_secs(3000));
    let second = cache.store(&embedding, "Repeat").unwrap();
    assert_eq!(first, second);
    assert_eq!(cache.len().unwrap(), 1);

    clock.advance(Duration::from_secs(1000));
    assert!(store.contains_key(&first));
    assert!(cache.verify(&embedding).unwrap().is_match());
}

#[test]
fn connect_waits_for_store_to_come_up() {
    let (cache, store, _) = cache_with_clock();
    store.set_reachable(false);

    let flipper = {
        let store = store.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            store.set_reachable(true);
        })
    };

    let attempts = cache.connect(&StopSignal::new()).unwrap();
    flipper.join().unwrap();
    assert!(attempts > 1, "expected retries, got {} attempt(s)", attempts);
}

#[test]
fn connect_aborts_on_stop() {
    let (cache, store, _) = cache_with_clock();
    store.set_reachable(false);

    let stop = StopSignal::new();
    let trigger = {
        let stop = stop.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            stop.trigger();
        })
    };

    assert!(matches!(cache.connect(&stop), Err(CacheError::Aborted)));
    trigger.join().unwrap();
}

#[test]
fn concurrent_store_and_verify_stay_consistent() {
    const IDENTITIES: usize = 8;
    const WRITERS: usize = 2;
    const READERS: usize = 3;
    const ROUNDS: usize = 200;

    let (cache, _, clock) = cache_with_clock();
    let cache = Arc::new(cache);

    // Orthogonal vectors, so a lookup can only ever match its own entry
    let faces: Arc<Vec<(Embedding, String)>> = Arc::new(
        (0..IDENTITIES)
            .map(|i| {
                let mut head = vec![0.0f32; IDENTITIES];
                head[i] = 1.0;
                (padded(&head), format!("Person {}", i))
            })
            .collect(),
    );

    let barrier = Arc::new(Barrier::new(WRITERS + READERS + 1));
    let mut handles = Vec::new();

    for writer in 0..WRITERS {
        let (cache, faces, barrier) = (cache.clone(), faces.clone(), barrier.clone());
        handles.push(thread::spawn(move || {
            barrier.wait();
            for round in 0..ROUNDS {
                // Writers walk the identities in opposite orders; every key is stored repeatedly
                let index = if writer % 2 == 0 {
                    round % IDENTITIES
                } else {
                    IDENTITIES - 1 - round % IDENTITIES
                };
                let (embedding, name) = &faces[index];
                cache.store(embedding, name).unwrap();
            }
        }));
    }

    for reader in 0..READERS {
        let (cache, faces, barrier) = (cache.clone(), faces.clone(), barrier.clone());
        handles.push(thread::spawn(move || {
            barrier.wait();
            for round in 0..ROUNDS {
                let (embedding, name) = &faces[(round + reader) % IDENTITIES];
                match cache.verify(embedding).unwrap() {
                    Verification::Match(identity) => {
                        assert_eq!(&identity.name, name);
                        assert!(identity.confidence > 99.99, "confidence {}", identity.confidence);
                    }
                    Verification::NoMatch => {}
                }
                let len = cache.len().unwrap();
                assert!(len <= IDENTITIES, "{} entries for {} keys", len, IDENTITIES);
            }
        }));
    }

    let ticker = {
        let (clock, barrier) = (clock.clone(), barrier.clone());
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..4 {
                thread::sleep(Duration::from_millis(2));
                clock.advance(Duration::from_secs(1200));
            }
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    ticker.join().unwrap();

    // Whatever survived is bounded by the distinct keys and expires with the TTL
    assert!(cache.len().unwrap() <= IDENTITIES);
    clock.advance(Duration::from_secs(3600));
    assert_eq!(cache.len().unwrap(), 0);
    for (embedding, _) in faces.iter() {
        assert_eq!(cache.verify(embedding).unwrap(), Verification::NoMatch);
    }

    let (embedding, name) = &faces[0];
    cache.store(embedding, name).unwrap();
    let verification = cache.verify(embedding).unwrap();
    assert_eq!(verification.identity().map(|i| i.name.as_str()), Some(name.as_str()));
}
