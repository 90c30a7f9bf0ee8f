// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Engine configuration
//!
//! Options for opening a proof file: which server binary to run, the
//! workspace it resolves imports from, and the request timeout.

use std::path::PathBuf;
use std::time::Duration;

use coq_proof_file_gateway::DEFAULT_TIMEOUT_SECS;

/// Configuration for a [`crate::ProofFile`] session.
#[derive(Debug, Clone)]
pub struct ProofFileOptions {
    /// Server binary, resolved through `PATH`
    pub server_path: String,

    /// Extra arguments passed to the server
    pub server_args: Vec<String>,

    /// Workspace root; the server locates `_CoqProject` there
    pub workspace: Option<PathBuf>,

    /// Timeout for every blocking server call
    pub timeout: Duration,
}

impl Default for ProofFileOptions {
    fn default() -> Self {
        Self {
            server_path: "coq-lsp".to_string(),
            server_args: Vec::new(),
            workspace: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ProofFileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server binary.
    pub fn with_server_path(mut self, path: impl Into<String>) -> Self {
        self.server_path = path.into();
        self
    }

    /// Set the workspace root.
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
