// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Server gateway
//!
//! Thin adapter over a running `coq-lsp` process. The engine talks to the
//! [`ProofServer`] trait; [`CoqLspClient`] implements it by spawning the
//! server and exchanging framed JSON-RPC over its stdio.
//!
//! ## Contract
//!
//! - request/response with total order per URI
//! - `change` always sends a full-text replacement
//! - progress and diagnostics arrive on the push channel and are buffered
//!   per (uri, version) until reconciled by `await_ready`/`diagnostics`
//! - every blocking call obeys a configurable timeout (default 60 s); a
//!   timed out call marks the session degraded and later calls fail fast

pub mod client;
pub mod error;
pub mod server;
pub mod transport;

pub use client::CoqLspClient;
pub use error::{GatewayError, GatewayResult};
pub use server::{ProofServer, ReadyStatus};
pub use transport::Transport;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
