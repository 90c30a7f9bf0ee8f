// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Scripted proof server
//!
//! [`ScriptedServer`] implements the gateway's `ProofServer` trait without
//! a real `coq-lsp`: it re-segments the document with the naive sentence
//! scanner on every change and answers goals and diagnostics from
//! substring rules.
//!
//! - an **error rule** marks every sentence containing a needle with an
//!   Error diagnostic, so invalid edits are rejected and rolled back
//! - a **goal rule** picks the goal configuration returned for sentences
//!   containing a needle; other sentences get an empty configuration
//! - an **ast** entry attaches a span payload to a sentence (keyed by its
//!   whitespace-normalized text), enabling term-context assertions
//!
//! Goal answers are canned with document version 0 so that re-fetched
//! answers compare equal across versions.

use std::collections::HashMap;

use async_trait::async_trait;
use lsp_types::{
    Diagnostic, DiagnosticSeverity, Position, Url, VersionedTextDocumentIdentifier,
};
use serde_json::Value;

use coq_proof_file_context::normalized_sentence;
use coq_proof_file_gateway::{GatewayResult, ProofServer, ReadyStatus};
use coq_proof_file_protocol::{
    CompletionStatus, CompletionTag, FlecheDocument, GoalAnswer, GoalConfig, RangedSpan,
};

use crate::scanner::{position_at, range_at, sentence_ranges};

#[derive(Debug, Clone)]
struct DocState {
    text: String,
    version: i32,
}

/// A scripted stand-in for `coq-lsp`.
#[derive(Debug, Default)]
pub struct ScriptedServer {
    docs: HashMap<Url, DocState>,
    error_rules: Vec<(String, String)>,
    missing_rules: Vec<(String, String)>,
    goal_rules: Vec<(String, GoalConfig)>,
    asts: HashMap<String, Value>,
    fail_processing: bool,

    /// Number of `change` calls observed (rollbacks included)
    pub change_count: usize,

    /// Number of `save` calls observed
    pub save_count: usize,
}

impl ScriptedServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every sentence containing `needle` with an Error diagnostic.
    pub fn with_error(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_rules.push((needle.into(), message.into()));
        self
    }

    /// Report an Error diagnostic whenever the document does *not*
    /// contain `needle`; simulates deleting a sentence the file needs.
    pub fn with_error_when_missing(
        mut self,
        needle: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.missing_rules.push((needle.into(), message.into()));
        self
    }

    /// Answer `proof/goals` with `config` for sentences containing
    /// `needle`.
    pub fn with_goal(mut self, needle: impl Into<String>, config: GoalConfig) -> Self {
        self.goal_rules.push((needle.into(), config));
        self
    }

    /// Attach a span payload to the sentence with the given normalized
    /// text.
    pub fn with_ast(mut self, sentence: impl Into<String>, payload: Value) -> Self {
        self.asts.insert(sentence.into(), payload);
        self
    }

    /// Report every version as failed processing.
    pub fn with_failed_processing(mut self) -> Self {
        self.fail_processing = true;
        self
    }

    fn doc(&self, uri: &Url) -> GatewayResult<&DocState> {
        self.docs.get(uri).ok_or_else(|| {
            coq_proof_file_gateway::GatewayError::Protocol(format!("unknown document {uri}"))
        })
    }

    fn computed_diagnostics(&self, text: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for (needle, message) in &self.missing_rules {
            if !text.contains(needle.as_str()) {
                diagnostics.push(Diagnostic {
                    range: lsp_types::Range::new(Position::new(0, 0), Position::new(0, 1)),
                    severity: Some(DiagnosticSeverity::ERROR),
                    message: message.clone(),
                    ..Default::default()
                });
            }
        }
        for (start, end) in sentence_ranges(text) {
            let sentence = &text[start..end];
            for (needle, message) in &self.error_rules {
                if sentence.contains(needle.as_str()) {
                    diagnostics.push(Diagnostic {
                        range: range_at(text, start, end),
                        severity: Some(DiagnosticSeverity::ERROR),
                        message: message.clone(),
                        ..Default::default()
                    });
                }
            }
        }
        diagnostics
    }
}

#[async_trait]
impl ProofServer for ScriptedServer {
    async fn open(&mut self, uri: &Url, text: &str) -> GatewayResult<()> {
        self.docs.insert(
            uri.clone(),
            DocState {
                text: text.to_string(),
                version: 1,
            },
        );
        Ok(())
    }

    async fn change(&mut self, uri: &Url, version: i32, text: &str) -> GatewayResult<()> {
        self.change_count += 1;
        let doc = self.docs.get_mut(uri).ok_or_else(|| {
            coq_proof_file_gateway::GatewayError::Protocol(format!("unknown document {uri}"))
        })?;
        doc.text = text.to_string();
        doc.version = version;
        Ok(())
    }

    async fn save(&mut self, _uri: &Url, _text: &str) -> GatewayResult<()> {
        self.save_count += 1;
        Ok(())
    }

    async fn close(&mut self, uri: &Url) -> GatewayResult<()> {
        self.docs.remove(uri);
        Ok(())
    }

    async fn goals(
        &mut self,
        uri: &Url,
        _version: i32,
        position: Position,
    ) -> GatewayResult<Option<GoalAnswer>> {
        let doc = self.doc(uri)?;
        let text = doc.text.clone();
        let sentence = sentence_ranges(&text)
            .into_iter()
            .find(|(start, _)| position_at(&text, *start) == position)
            .map(|(start, end)| text[start..end].to_string());

        let Some(sentence) = sentence else {
            return Ok(None);
        };
        let config = self
            .goal_rules
            .iter()
            .find(|(needle, _)| sentence.contains(needle.as_str()))
            .map(|(_, config)| config.clone())
            .unwrap_or_else(|| GoalConfig::focused(vec![]));

        Ok(Some(GoalAnswer {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: 0,
            },
            position,
            messages: vec![],
            goals: Some(config),
            error: None,
            program: vec![],
        }))
    }

    async fn fleche_document(&mut self, uri: &Url, _version: i32) -> GatewayResult<FlecheDocument> {
        let doc = self.doc(uri)?;
        let text = doc.text.clone();
        let spans = sentence_ranges(&text)
            .into_iter()
            .map(|(start, end)| RangedSpan {
                range: range_at(&text, start, end),
                span: self.asts.get(&normalized_sentence(&text[start..end])).cloned(),
            })
            .collect();
        let end = position_at(&text, text.len());
        Ok(FlecheDocument {
            spans,
            completed: CompletionStatus {
                status: if self.fail_processing {
                    CompletionTag::Failed
                } else {
                    CompletionTag::Yes
                },
                range: lsp_types::Range::new(Position::new(0, 0), end),
            },
        })
    }

    async fn await_ready(&mut self, _uri: &Url, _version: i32) -> GatewayResult<ReadyStatus> {
        Ok(if self.fail_processing {
            ReadyStatus::Failed
        } else {
            ReadyStatus::Ok
        })
    }

    fn diagnostics(&self, uri: &Url) -> Vec<Diagnostic> {
        match self.docs.get(uri) {
            Some(doc) => self.computed_diagnostics(&doc.text),
            None => Vec::new(),
        }
    }

    async fn shutdown(&mut self) -> GatewayResult<()> {
        self.docs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> Url {
        Url::parse("file:///scripted.v").unwrap()
    }

    #[tokio::test]
    async fn test_resegments_on_change() {
        let mut server = ScriptedServer::new();
        server.open(&uri(), "Goal True.\n").await.unwrap();
        let before = server.fleche_document(&uri(), 1).await.unwrap();
        assert_eq!(before.spans.len(), 1);

        server
            .change(&uri(), 2, "Goal True.\ntrivial.\nQed.\n")
            .await
            .unwrap();
        let after = server.fleche_document(&uri(), 2).await.unwrap();
        assert_eq!(after.spans.len(), 3);
        assert_eq!(server.change_count, 1);
    }

    #[tokio::test]
    async fn test_error_rule_produces_diagnostics() {
        let mut server =
            ScriptedServer::new().with_error("invalid_tactic", "invalid_tactic was not found");
        server
            .open(&uri(), "Goal True.\ninvalid_tactic.\n")
            .await
            .unwrap();
        let diagnostics = server.diagnostics(&uri());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
    }

    #[tokio::test]
    async fn test_goals_echo_position() {
        let mut server = ScriptedServer::new();
        server.open(&uri(), "Goal True.\ntrivial.\n").await.unwrap();

        let answer = server
            .goals(&uri(), 1, Position::new(1, 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(answer.position, Position::new(1, 0));
        assert_eq!(answer.text_document.version, 0);

        // nothing starts at this position
        let missing = server.goals(&uri(), 1, Position::new(0, 5)).await.unwrap();
        assert!(missing.is_none());
    }
}
