// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # facegate-observability
//!
//! Logging setup shared by the facegate binary and tests, with per-crate
//! debug flag support.
//!
//! ## Features
//! - `file-logging`: JSON log files per run with retention

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known facegate crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "facegate",
    "facegate-config",
    "facegate-runtime",
    "facegate-cache",
    "facegate-validation",
];
