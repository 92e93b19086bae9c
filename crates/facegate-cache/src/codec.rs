// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cache document encoding
//!
//! Keys are `doc:<hex sha256>` of the embedding's little-endian `f32` bytes, so
//! bit-identical embeddings collide and near-identical ones do not. Tag values
//! cannot carry raw spaces, which are stored as `|`.

use crate::{CacheError, CacheResult, KEY_PREFIX};
use sha2::{Digest, Sha256};

const TAG_SEPARATOR: char = '|';

/// Raw little-endian `f32` bytes (`len * 4` bytes)
pub fn embedding_to_bytes(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Inverse of [`embedding_to_bytes`]
pub fn embedding_from_bytes(bytes: &[u8]) -> CacheResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(CacheError::InvalidEntry(format!(
            "embedding blob of {} bytes is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Content-hash key for an embedding
pub fn cache_key(values: &[f32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(embedding_to_bytes(values));
    format!("{}{:x}", KEY_PREFIX, hasher.finalize())
}

/// Name as stored in the tag field
pub fn encode_tag(name: &str) -> String {
    name.replace(' ', &TAG_SEPARATOR.to_string())
}

/// Name as shown to users
pub fn decode_tag(tag: &str) -> String {
    tag.replace(TAG_SEPARATOR, " ")
}

/// Cosine distance `1 - cos(a, b)`
///
/// Accumulates in `f64`. A zero-norm vector is at distance 1 from everything.
/// Mismatched lengths are compared over the shorter prefix; callers validate
/// dimensions before getting here.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 1.0;
    }
    1.0 - (dot / denom).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_are_little_endian() {
        let bytes = embedding_to_bytes(&[1.0, -2.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(embedding_from_bytes(&bytes).unwrap(), vec![1.0, -2.5]);
    }

    #[test]
    fn test_truncated_blob_rejected() {
        assert!(matches!(
            embedding_from_bytes(&[0, 0, 128]),
            Err(CacheError::InvalidEntry(_))
        ));
    }

    #[test]
    fn test_key_is_sha256_of_raw_bytes() {
        // sha256 of the 4 zero bytes of `0.0f32`
        assert_eq!(
            cache_key(&[0.0]),
            "doc:df3f619804a92fdb4057192dc43dd748ea778adc52bc498ce80524c014b81119"
        );
    }

    #[test]
    fn test_key_distinguishes_near_identical() {
        let a = vec![0.25f32; 512];
        let mut b = a.clone();
        b[511] = f32::from_bits(b[511].to_bits() + 1);
        assert_eq!(cache_key(&a), cache_key(&a.clone()));
        assert_ne!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn test_tag_round_trip() {
        assert_eq!(encode_tag("Ada King Lovelace"), "Ada|King|Lovelace");
        assert_eq!(decode_tag("Ada|King|Lovelace"), "Ada King Lovelace");
    }

    #[test]
    fn test_cosine_distance() {
        assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[0.0, 1.0]), 1.0);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]), 2.0);
        assert_eq!(cosine_distance(&[1.0, 1.0, 0.0], &[1.0, 0.0, 1.0]), 0.5);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
