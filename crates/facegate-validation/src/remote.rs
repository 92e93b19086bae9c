// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Remote validation authority
//!
//! Consulted on a cache miss. The HTTP client maps responses as follows:
//!
//! | response | verdict |
//! |---|---|
//! | `200`, `exists` true or absent | [`RemoteVerdict::Verified`] |
//! | `200`, `exists: false` | [`RemoteVerdict::Rejected`] |
//! | `5xx`, `408`, `429`, timeout, transport failure, undecodable body | [`RemoteError`] |
//! | any other status | [`RemoteVerdict::Rejected`] |

use facegate_runtime::Embedding;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// Path of the validation endpoint, relative to the authority's base URL
pub const VALIDATE_PATH: &str = "/api/v1/embedding/validate";

/// Remote authority failures (never an authoritative answer)
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("Remote validator unreachable: {0}")]
    Transport(String),

    #[error("Remote validator returned HTTP {0}")]
    Status(u16),

    #[error("Invalid response from remote validator: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteVerdict {
    Verified {
        name: Option<String>,
        /// Percent, as reported by the authority
        confidence: Option<f32>,
        /// Authority's enrolled embedding for this identity
        canonical: Option<Embedding>,
    },
    Rejected,
}

pub trait RemoteValidator: Send + Sync {
    fn validate(&self, embedding: &Embedding) -> Result<RemoteVerdict, RemoteError>;
}

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    vector: &'a [f32],
}

#[derive(Debug, Default, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    exists: Option<bool>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    accuracy: Option<f32>,
}

/// Statuses that say nothing about the embedding: retry later instead of denying
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error()
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

impl From<ValidateResponse> for RemoteVerdict {
    fn from(response: ValidateResponse) -> Self {
        if response.exists == Some(false) {
            return RemoteVerdict::Rejected;
        }
        RemoteVerdict::Verified {
            name: response.name.filter(|n| !n.trim().is_empty()),
            confidence: response.accuracy,
            canonical: response.vector.filter(|v| !v.is_empty()).map(Embedding::new),
        }
    }
}

/// Blocking HTTP client for the validation endpoint
pub struct HttpRemoteValidator {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpRemoteValidator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), VALIDATE_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RemoteValidator for HttpRemoteValidator {
    fn validate(&self, embedding: &Embedding) -> Result<RemoteVerdict, RemoteError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ValidateRequest {
                vector: embedding.as_slice(),
            })
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        trace!("[REMOTE] {} -> {}", self.endpoint, status);

        if is_transient_status(status) {
            return Err(RemoteError::Status(status.as_u16()));
        }
        if status != reqwest::StatusCode::OK {
            debug!("[REMOTE] Rejected with HTTP {}", status.as_u16());
            return Ok(RemoteVerdict::Rejected);
        }

        let body = response
            .bytes()
            .map_err(|e| RemoteError::Transport(format!("reading body: {e}")))?;
        let parsed: ValidateResponse = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        Ok(parsed.into())
    }
}
