// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # coq-lsp client
//!
//! [`CoqLspClient`] spawns a `coq-lsp` process and drives it over stdio:
//! the standard document lifecycle plus the Coq extensions (`proof/goals`,
//! `coq/getDocument`, `$/coq/fileProgress`).
//!
//! Requests are serialized; while waiting for a response, incoming
//! notifications are absorbed into a per-URI buffer and server-to-client
//! requests are acknowledged with an empty result. A request that exceeds
//! the configured timeout leaves the server in an unknown state: the
//! session is marked degraded and every subsequent call fails fast.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use lsp_types::{
    Diagnostic, DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, Position, PublishDiagnosticsParams, TextDocumentContentChangeEvent,
    TextDocumentIdentifier, TextDocumentItem, Url, VersionedTextDocumentIdentifier,
};
use serde_json::{json, Value};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use async_trait::async_trait;
use coq_proof_file_protocol::{
    CompletionTag, FileProgressParams, FlecheDocument, GoalAnswer, GoalRequest,
};

use crate::error::{GatewayError, GatewayResult};
use crate::server::{ProofServer, ReadyStatus};
use crate::transport::Transport;

/// How long to wait for push traffic before probing the document status.
const PROGRESS_POLL: Duration = Duration::from_millis(200);

/// Buffered push-channel state, reconciled per (uri, version).
#[derive(Debug, Default)]
pub(crate) struct NotificationBuffer {
    /// Latest published diagnostics per document
    diagnostics: HashMap<Url, Vec<Diagnostic>>,

    /// Versions whose processing completed
    ready: HashSet<(Url, i32)>,

    /// Versions that hit a fatal processing error
    failed: HashSet<(Url, i32)>,
}

impl NotificationBuffer {
    /// Absorb one notification by method name.
    pub(crate) fn absorb(&mut self, method: &str, params: Option<&Value>) {
        match method {
            "textDocument/publishDiagnostics" => {
                let Some(params) = params else { return };
                match serde_json::from_value::<PublishDiagnosticsParams>(params.clone()) {
                    Ok(published) => {
                        debug!(
                            "{} diagnostics for {}",
                            published.diagnostics.len(),
                            published.uri
                        );
                        self.diagnostics
                            .insert(published.uri, published.diagnostics);
                    }
                    Err(e) => warn!("malformed publishDiagnostics: {e}"),
                }
            }
            "$/coq/fileProgress" => {
                let Some(params) = params else { return };
                match serde_json::from_value::<FileProgressParams>(params.clone()) {
                    Ok(progress) => {
                        let key = (
                            progress.text_document.uri.clone(),
                            progress.text_document.version,
                        );
                        if progress.has_fatal_error() {
                            self.failed.insert(key.clone());
                        }
                        if progress.is_done() {
                            self.ready.insert(key);
                        }
                    }
                    Err(e) => warn!("malformed fileProgress: {e}"),
                }
            }
            other => trace!("ignoring notification {other}"),
        }
    }

    pub(crate) fn diagnostics(&self, uri: &Url) -> Vec<Diagnostic> {
        self.diagnostics.get(uri).cloned().unwrap_or_default()
    }

    pub(crate) fn take_ready(&mut self, uri: &Url, version: i32) -> Option<ReadyStatus> {
        let key = (uri.clone(), version);
        if self.failed.remove(&key) {
            return Some(ReadyStatus::Failed);
        }
        if self.ready.remove(&key) {
            return Some(ReadyStatus::Ok);
        }
        None
    }
}

/// Client for a spawned `coq-lsp` process.
pub struct CoqLspClient {
    transport: Transport<ChildStdout, ChildStdin>,
    child: Child,
    next_id: u64,
    timeout: Duration,
    degraded: bool,
    buffer: NotificationBuffer,
}

impl CoqLspClient {
    /// Spawn the server and run the initialize handshake.
    ///
    /// `workspace` becomes the process working directory and the root URI,
    /// so the server resolves `_CoqProject` from there.
    pub async fn spawn(
        command: &str,
        args: &[String],
        workspace: Option<&Path>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = workspace {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| {
            GatewayError::Protocol("server process has no stdin".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            GatewayError::Protocol("server process has no stdout".to_string())
        })?;

        let mut client = Self {
            transport: Transport::new(stdout, stdin),
            child,
            next_id: 1,
            timeout,
            degraded: false,
            buffer: NotificationBuffer::default(),
        };
        client.initialize(workspace).await?;
        Ok(client)
    }

    async fn initialize(&mut self, workspace: Option<&Path>) -> GatewayResult<()> {
        let root_uri = workspace.and_then(|dir| Url::from_directory_path(dir).ok());
        let params = json!({
            "processId": std::process::id(),
            "rootUri": root_uri,
            "capabilities": {},
        });
        self.request("initialize", params).await?;
        self.notify("initialized", json!({})).await?;
        Ok(())
    }

    fn ensure_live(&self) -> GatewayResult<()> {
        if self.degraded {
            Err(GatewayError::Degraded)
        } else {
            Ok(())
        }
    }

    async fn notify(&mut self, method: &str, params: Value) -> GatewayResult<()> {
        self.ensure_live()?;
        self.transport
            .send(&json!({ "jsonrpc": "2.0", "method": method, "params": params }))
            .await
    }

    async fn request(&mut self, method: &str, params: Value) -> GatewayResult<Value> {
        self.ensure_live()?;
        let id = self.next_id;
        self.next_id += 1;
        self.transport
            .send(&json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .await?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                self.degraded = true;
                return Err(GatewayError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            };
            let message = match tokio::time::timeout(remaining, self.transport.receive()).await {
                Ok(result) => result?,
                Err(_) => {
                    self.degraded = true;
                    return Err(GatewayError::Timeout {
                        seconds: self.timeout.as_secs(),
                    });
                }
            };
            if let Some((response_id, result)) = self.dispatch(message).await? {
                if response_id == id {
                    return Ok(result);
                }
                warn!("dropping stale response {response_id}, waiting for {id}");
            }
        }
    }

    /// Triage one incoming message: absorb notifications, acknowledge
    /// server-to-client requests, surface responses.
    async fn dispatch(&mut self, message: Value) -> GatewayResult<Option<(u64, Value)>> {
        if let Some(method) = message.get("method").and_then(Value::as_str) {
            let method = method.to_string();
            if let Some(id) = message.get("id").cloned() {
                // server-to-client request (configuration, registration):
                // acknowledge so the pipe keeps moving
                trace!("acknowledging server request {method}");
                self.transport
                    .send(&json!({ "jsonrpc": "2.0", "id": id, "result": null }))
                    .await?;
            } else {
                self.buffer.absorb(&method, message.get("params"));
            }
            return Ok(None);
        }

        let id = message
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| GatewayError::Protocol("response without id".to_string()))?;
        if let Some(error) = message.get("error") {
            return Err(GatewayError::ServerError {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown server error")
                    .to_string(),
            });
        }
        Ok(Some((
            id,
            message.get("result").cloned().unwrap_or(Value::Null),
        )))
    }

    async fn get_document(&mut self, uri: &Url, version: i32) -> GatewayResult<FlecheDocument> {
        let params = json!({
            "textDocument": VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version,
            }
        });
        let result = self.request("coq/getDocument", params).await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl ProofServer for CoqLspClient {
    async fn open(&mut self, uri: &Url, text: &str) -> GatewayResult<()> {
        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "coq".to_string(),
                version: 1,
                text: text.to_string(),
            },
        };
        self.notify("textDocument/didOpen", serde_json::to_value(params)?)
            .await
    }

    async fn change(&mut self, uri: &Url, version: i32, text: &str) -> GatewayResult<()> {
        let params = DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: text.to_string(),
            }],
        };
        self.notify("textDocument/didChange", serde_json::to_value(params)?)
            .await
    }

    async fn save(&mut self, uri: &Url, text: &str) -> GatewayResult<()> {
        let params = DidSaveTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            text: Some(text.to_string()),
        };
        self.notify("textDocument/didSave", serde_json::to_value(params)?)
            .await
    }

    async fn close(&mut self, uri: &Url) -> GatewayResult<()> {
        let params = DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        };
        self.notify("textDocument/didClose", serde_json::to_value(params)?)
            .await
    }

    async fn goals(
        &mut self,
        uri: &Url,
        version: i32,
        position: Position,
    ) -> GatewayResult<Option<GoalAnswer>> {
        let params = GoalRequest {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version,
            },
            position,
        };
        let result = self
            .request("proof/goals", serde_json::to_value(params)?)
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    async fn fleche_document(&mut self, uri: &Url, version: i32) -> GatewayResult<FlecheDocument> {
        self.get_document(uri, version).await
    }

    async fn await_ready(&mut self, uri: &Url, version: i32) -> GatewayResult<ReadyStatus> {
        self.ensure_live()?;
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(status) = self.buffer.take_ready(uri, version) {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                self.degraded = true;
                return Err(GatewayError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
            match tokio::time::timeout(PROGRESS_POLL, self.transport.receive()).await {
                Ok(message) => {
                    self.dispatch(message?).await?;
                }
                Err(_) => {
                    // quiet pipe: the progress stream may have finished
                    // before we started listening; ask the document
                    let document = self.get_document(uri, version).await?;
                    match document.completed.status {
                        CompletionTag::Yes => return Ok(ReadyStatus::Ok),
                        CompletionTag::Failed => return Ok(ReadyStatus::Failed),
                        CompletionTag::Stopped => {}
                    }
                }
            }
        }
    }

    fn diagnostics(&self, uri: &Url) -> Vec<Diagnostic> {
        self.buffer.diagnostics(uri)
    }

    async fn shutdown(&mut self) -> GatewayResult<()> {
        if !self.degraded {
            // best effort; a wedged server should not block teardown
            if let Err(e) = self.request("shutdown", Value::Null).await {
                debug!("shutdown request failed: {e}");
            }
            let _ = self.notify("exit", Value::Null).await;
        }
        self.child.start_kill()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> Url {
        Url::parse("file:///test.v").unwrap()
    }

    #[test]
    fn test_buffer_records_diagnostics() {
        let mut buffer = NotificationBuffer::default();
        let params = json!({
            "uri": "file:///test.v",
            "diagnostics": [
                { "range": { "start": { "line": 0, "character": 0 },
                             "end": { "line": 0, "character": 3 } },
                  "severity": 1,
                  "message": "The reference invalid_tactic was not found" }
            ]
        });
        buffer.absorb("textDocument/publishDiagnostics", Some(&params));

        let diagnostics = buffer.diagnostics(&uri());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("invalid_tactic"));
    }

    #[test]
    fn test_buffer_latest_diagnostics_win() {
        let mut buffer = NotificationBuffer::default();
        let first = json!({ "uri": "file:///test.v", "diagnostics": [
            { "range": { "start": { "line": 0, "character": 0 },
                         "end": { "line": 0, "character": 1 } },
              "message": "old" } ] });
        let second = json!({ "uri": "file:///test.v", "diagnostics": [] });
        buffer.absorb("textDocument/publishDiagnostics", Some(&first));
        buffer.absorb("textDocument/publishDiagnostics", Some(&second));
        assert!(buffer.diagnostics(&uri()).is_empty());
    }

    #[test]
    fn test_buffer_progress_completion() {
        let mut buffer = NotificationBuffer::default();
        let busy = json!({
            "textDocument": { "uri": "file:///test.v", "version": 2 },
            "processing": [
                { "range": { "start": { "line": 0, "character": 0 },
                             "end": { "line": 5, "character": 0 } } }
            ]
        });
        buffer.absorb("$/coq/fileProgress", Some(&busy));
        assert_eq!(buffer.take_ready(&uri(), 2), None);

        let done = json!({
            "textDocument": { "uri": "file:///test.v", "version": 2 },
            "processing": []
        });
        buffer.absorb("$/coq/fileProgress", Some(&done));
        assert_eq!(buffer.take_ready(&uri(), 2), Some(ReadyStatus::Ok));
        // consumed
        assert_eq!(buffer.take_ready(&uri(), 2), None);
    }

    #[test]
    fn test_buffer_fatal_progress() {
        let mut buffer = NotificationBuffer::default();
        let fatal = json!({
            "textDocument": { "uri": "file:///test.v", "version": 3 },
            "processing": [
                { "range": { "start": { "line": 1, "character": 0 },
                             "end": { "line": 1, "character": 4 } },
                  "kind": 2 }
            ]
        });
        buffer.absorb("$/coq/fileProgress", Some(&fatal));
        assert_eq!(buffer.take_ready(&uri(), 3), Some(ReadyStatus::Failed));
    }

    #[test]
    fn test_buffer_ignores_unknown_notifications() {
        let mut buffer = NotificationBuffer::default();
        buffer.absorb("window/logMessage", Some(&json!({ "type": 3, "message": "hi" })));
        assert!(buffer.diagnostics(&uri()).is_empty());
    }
}
