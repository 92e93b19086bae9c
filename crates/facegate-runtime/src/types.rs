// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Values carried between pipeline stages

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Embedding dimension produced by the recognition model
pub const EMBEDDING_DIMENSIONS: usize = 512;

/// Immutable face embedding
///
/// Backed by an `Arc<[f32]>`, so handing the latest embedding from one stage
/// to another never copies the vector.
#[derive(Clone, PartialEq)]
pub struct Embedding(Arc<[f32]>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into())
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Bit-level equality (distinguishes `0.0` from `-0.0`, equates NaNs with equal payloads)
    pub fn bit_eq(&self, other: &Embedding) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

impl fmt::Debug for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: Vec<f32> = self.0.iter().take(4).copied().collect();
        f.debug_struct("Embedding")
            .field("dimension", &self.0.len())
            .field("head", &head)
            .finish()
    }
}

/// Raw camera frame (interleaved 8-bit channels)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            data,
        }
    }
}

/// Access decision published by the validation stage
///
/// Discriminants match the status codes the display layer has always used
/// (0 granted, 1 denied, 2 not found).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccessDecision {
    Granted = 0,
    Denied = 1,
    /// No current embedding to evaluate
    #[default]
    NotFound = 2,
    /// Remote authority could not be consulted
    Unavailable = 3,
}

impl AccessDecision {
    /// Overlay text shown by the render stage
    pub fn label(&self) -> &'static str {
        match self {
            AccessDecision::Granted => "Access Granted",
            AccessDecision::Denied => "Access Denied",
            AccessDecision::NotFound => "Not Found",
            AccessDecision::Unavailable => "Validation Unavailable",
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity attached to a granted decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub name: String,
    /// Match confidence in percent (0-100)
    pub confidence: f32,
}

impl IdentityRecord {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 100.0),
        }
    }
}
