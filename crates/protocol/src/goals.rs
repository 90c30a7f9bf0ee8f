// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # `proof/goals` wire types
//!
//! Serde models for the goal state returned by the server at a document
//! position. The shapes mirror the coq-lsp protocol: a [`GoalAnswer`]
//! carries the focused goals, the bullet-suspended stack, shelved and
//! given-up goals, and any feedback messages produced at that point.

use lsp_types::{Position, Range, VersionedTextDocumentIdentifier};
use serde::{Deserialize, Serialize};

/// A hypothesis in a goal's local context.
///
/// The server may serialize the optional body under `def`; both spellings
/// are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyp {
    /// Names bound by this hypothesis (e.g. `["n", "m"]` for `n, m : nat`)
    pub names: Vec<String>,

    /// The hypothesis type, pretty-printed
    pub ty: String,

    /// The hypothesis body, for let-bound hypotheses
    #[serde(default, alias = "def", skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl Hyp {
    pub fn new(names: Vec<String>, ty: impl Into<String>) -> Self {
        Self {
            names,
            ty: ty.into(),
            definition: None,
        }
    }
}

/// A single proof goal: hypotheses plus the conclusion type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Local hypotheses, outermost first
    #[serde(default)]
    pub hyps: Vec<Hyp>,

    /// The conclusion, pretty-printed
    pub ty: String,
}

impl Goal {
    pub fn new(hyps: Vec<Hyp>, ty: impl Into<String>) -> Self {
        Self {
            hyps,
            ty: ty.into(),
        }
    }
}

/// The full goal configuration at a position.
///
/// `stack` holds the goals suspended by bullets and focusing braces as
/// (before, after) pairs, innermost context first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    /// Currently focused goals
    #[serde(default)]
    pub goals: Vec<Goal>,

    /// Bullet-suspended contexts as (before, after) pairs
    #[serde(default)]
    pub stack: Vec<(Vec<Goal>, Vec<Goal>)>,

    /// Shelved goals
    #[serde(default)]
    pub shelf: Vec<Goal>,

    /// Goals abandoned with `give_up`
    #[serde(default)]
    pub given_up: Vec<Goal>,

    /// The bullet expected at this point, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<String>,
}

impl GoalConfig {
    /// A configuration with only focused goals and nothing suspended.
    pub fn focused(goals: Vec<Goal>) -> Self {
        Self {
            goals,
            stack: Vec::new(),
            shelf: Vec::new(),
            given_up: Vec::new(),
            bullet: None,
        }
    }
}

/// A feedback message attached to a goal answer.
///
/// Older servers send plain strings; newer ones send structured records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Plain(String),
    Structured {
        level: i32,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<Range>,
    },
}

impl Message {
    /// The message text regardless of representation.
    pub fn text(&self) -> &str {
        match self {
            Message::Plain(text) => text,
            Message::Structured { text, .. } => text,
        }
    }
}

/// Parameters of the `proof/goals` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRequest {
    #[serde(rename = "textDocument")]
    pub text_document: VersionedTextDocumentIdentifier,
    pub position: Position,
}

/// The `proof/goals` response: the snapshot of the proof state at a
/// position, or an error when the server could not produce one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAnswer {
    #[serde(rename = "textDocument")]
    pub text_document: VersionedTextDocumentIdentifier,

    /// The position the goals were requested at
    pub position: Position,

    /// Feedback messages produced at this point
    #[serde(default)]
    pub messages: Vec<Message>,

    /// The goal configuration; absent outside proofs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<GoalConfig>,

    /// Server-side error while recovering the state, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,

    /// Pending `Program` obligation information
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub program: Vec<serde_json::Value>,
}
