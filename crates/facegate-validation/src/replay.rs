// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Recorded embedding feed
//!
//! Stands in for the capture and recognition stages. A replay file is a JSON
//! array whose items are either an embedding (array of numbers) or `null`,
//! meaning "no face in view".

use crate::{Result, ValidationError};
use facegate_runtime::{Embedding, SharedState, Stage, TickControl};
use std::path::Path;
use tracing::{debug, info};

/// Parse replay JSON, checking every embedding has `dimension` values
pub fn parse_replay(json: &str, dimension: usize) -> Result<Vec<Option<Embedding>>> {
    let raw: Vec<Option<Vec<f32>>> = serde_json::from_str(json)?;
    raw.into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Some(values) if values.len() != dimension => Err(ValidationError::Replay(format!(
                "entry {} has dimension {}, expected {}",
                index,
                values.len(),
                dimension
            ))),
            Some(values) => Ok(Some(Embedding::new(values))),
            None => Ok(None),
        })
        .collect()
}

pub fn load_replay_file(path: &Path, dimension: usize) -> Result<Vec<Option<Embedding>>> {
    let contents = std::fs::read_to_string(path)?;
    let items = parse_replay(&contents, dimension)?;
    info!("[REPLAY] Loaded {} entries from {}", items.len(), path.display());
    Ok(items)
}

pub struct EmbeddingReplay {
    state: SharedState,
    items: Vec<Option<Embedding>>,
    cursor: usize,
    looping: bool,
}

impl EmbeddingReplay {
    pub fn new(state: SharedState, items: Vec<Option<Embedding>>) -> Self {
        Self {
            state,
            items,
            cursor: 0,
            looping: false,
        }
    }

    /// Restart from the first entry instead of stopping at the end
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Stage for EmbeddingReplay {
    fn name(&self) -> &str {
        "replay"
    }

    fn tick(&mut self) -> TickControl {
        if self.cursor >= self.items.len() {
            if !self.looping || self.items.is_empty() {
                return TickControl::Stop;
            }
            self.cursor = 0;
        }

        match &self.items[self.cursor] {
            Some(embedding) => {
                self.state.publish_embedding(embedding.clone());
            }
            None => {
                self.state.clear_embedding();
            }
        }
        debug!("[REPLAY] Published entry {}", self.cursor);
        self.cursor += 1;
        TickControl::Continue
    }

    fn on_stop(&mut self) {
        info!("[REPLAY] Stopped at entry {} of {}", self.cursor, self.items.len());
    }
}
