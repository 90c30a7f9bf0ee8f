// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for the server gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while talking to the language server
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The server process could not be started or its pipe broke
    #[error("Server unavailable: {0}")]
    ServerUnavailable(#[from] std::io::Error),

    /// A request did not complete within the configured timeout
    #[error("Server timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The byte stream did not frame a valid message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A payload failed to (de)serialize
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered a request with a JSON-RPC error
    #[error("Server error {code}: {message}")]
    ServerError { code: i64, message: String },

    /// A previous timeout left the session in an unknown state; all
    /// subsequent calls fail fast
    #[error("Session degraded by an earlier timeout")]
    Degraded,
}
