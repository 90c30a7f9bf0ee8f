// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # The server seam
//!
//! [`ProofServer`] is the interface the engine consumes: request/response
//! with a total order per URI, plus a buffered view of the push channel
//! (diagnostics, progress). The production implementation is
//! [`crate::CoqLspClient`]; tests substitute a scripted server.

use async_trait::async_trait;
use lsp_types::{Diagnostic, Position, Url};

use coq_proof_file_protocol::{FlecheDocument, GoalAnswer};

use crate::error::GatewayResult;

/// Outcome of waiting for the server to finish checking a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyStatus {
    /// The version was fully processed
    Ok,
    /// The server reported a fatal error while processing
    Failed,
}

/// Gateway to a Coq language server for one session.
///
/// All methods are request/response from the caller's perspective; push
/// notifications are reconciled internally while waiting for responses.
/// Implementations must serialize requests per URI and consume responses
/// in order.
#[async_trait]
pub trait ProofServer: Send {
    /// Open a document with its initial text.
    async fn open(&mut self, uri: &Url, text: &str) -> GatewayResult<()>;

    /// Replace the document content. The gateway always sends a full-text
    /// replacement, never partial edits.
    async fn change(&mut self, uri: &Url, version: i32, text: &str) -> GatewayResult<()>;

    /// Notify the server that the document was written to disk.
    async fn save(&mut self, uri: &Url, text: &str) -> GatewayResult<()>;

    /// Close the document.
    async fn close(&mut self, uri: &Url) -> GatewayResult<()>;

    /// The goal state at a position, or `None` when the server has no
    /// proof state there.
    async fn goals(
        &mut self,
        uri: &Url,
        version: i32,
        position: Position,
    ) -> GatewayResult<Option<GoalAnswer>>;

    /// The authoritative structured view of the document.
    async fn fleche_document(&mut self, uri: &Url, version: i32) -> GatewayResult<FlecheDocument>;

    /// Block until the server finished processing `version`, signaled by a
    /// `fileProgress` with empty processing or a settled completion
    /// status.
    async fn await_ready(&mut self, uri: &Url, version: i32) -> GatewayResult<ReadyStatus>;

    /// Latest published diagnostics for the document.
    fn diagnostics(&self, uri: &Url) -> Vec<Diagnostic>;

    /// Tear down the session.
    async fn shutdown(&mut self) -> GatewayResult<()>;
}
