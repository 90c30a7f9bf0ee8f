// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for term context lookup

use thiserror::Error;

/// Result type alias for context operations
pub type ContextResult<T> = Result<T, ContextError>;

/// Errors that can occur while querying the term context
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No notation matches the requested pattern and scope
    #[error("Notation not found: \"{pattern}\" (scope: {scope:?})")]
    NotationNotFound {
        pattern: String,
        scope: Option<String>,
    },

    /// Term lookup failed for a (possibly qualified) name
    #[error("Term not found: {0}")]
    TermNotFound(String),
}
