// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error taxonomy of the proof-file engine
//!
//! Gateway and context errors are translated at the engine boundary into
//! this taxonomy. Mutating operations roll back fully before surfacing an
//! error; a timed out server is reported as [`EngineError::InvalidFile`]
//! because the session can no longer be trusted.

use thiserror::Error;

use coq_proof_file_context::ContextError;
use coq_proof_file_gateway::GatewayError;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the proof-file engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Communication with the server failed
    #[error("Server error: {0}")]
    Server(GatewayError),

    /// The file contains errors that prevent safe editing
    #[error("Invalid file: {reason}")]
    InvalidFile { reason: String },

    /// An `add_step` produced extra sentences, modified its neighbors, or
    /// introduced an error diagnostic
    #[error("Invalid step added after index {index}: {reason}")]
    InvalidAdd { index: isize, reason: String },

    /// A `delete_step` removed a sentence the file needs to stay valid
    #[error("Invalid deletion of step {index}: {reason}")]
    InvalidDelete { index: usize, reason: String },

    /// A batch change failed without a single attributable edit
    #[error("Invalid step change: {reason}")]
    InvalidStep { reason: String },

    /// The step-oriented API refuses edits outside any proof; use
    /// `change_steps` for those
    #[error("Not implemented: {reason}")]
    NotImplemented { reason: String },

    /// The server's structured document disagrees with the local text
    #[error("Protocol desync: {0}")]
    Desync(String),

    /// Term context lookup failure (e.g. an unknown notation)
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Reading or writing the source file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GatewayError> for EngineError {
    fn from(error: GatewayError) -> Self {
        match error {
            // a timeout leaves the session unusable for further edits
            GatewayError::Timeout { seconds } => EngineError::InvalidFile {
                reason: format!("server timed out after {seconds}s"),
            },
            GatewayError::Degraded => EngineError::InvalidFile {
                reason: "session degraded by an earlier timeout".to_string(),
            },
            other => EngineError::Server(other),
        }
    }
}
