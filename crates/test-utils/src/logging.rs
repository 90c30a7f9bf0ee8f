// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Test logging
//!
//! Installs a `tracing` subscriber for tests, filtered by `RUST_LOG`.
//! Safe to call from every test; only the first call installs.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging once per process.
///
/// Set `RUST_LOG=coq_proof_file_engine=debug` (or any filter) to see
/// engine traces while a test runs.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
