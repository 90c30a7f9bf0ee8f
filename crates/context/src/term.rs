// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Terms and term types
//!
//! A [`Term`] is a named Coq entity recorded by the context: a definition,
//! inductive, lemma, notation, tactic, and so on, together with the module
//! path it was defined under and its source range.

use coq_proof_file_protocol::span::{sentence_of, OpenerKeyword};
use lsp_types::Range;
use serde::{Deserialize, Serialize};

/// Kind of a recorded term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TermType {
    Inductive,
    Definition,
    Notation,
    Fixpoint,
    Lemma,
    Theorem,
    Remark,
    Fact,
    Corollary,
    Proposition,
    Property,
    Tactic,
    Record,
    Class,
    Instance,
    Obligation,
    Other,
}

impl TermType {
    /// Term type of a proof-opening keyword.
    pub fn from_opener(keyword: OpenerKeyword) -> Self {
        match keyword {
            OpenerKeyword::Theorem => TermType::Theorem,
            OpenerKeyword::Lemma => TermType::Lemma,
            OpenerKeyword::Remark => TermType::Remark,
            OpenerKeyword::Fact => TermType::Fact,
            OpenerKeyword::Corollary => TermType::Corollary,
            OpenerKeyword::Proposition => TermType::Proposition,
            OpenerKeyword::Property => TermType::Property,
            OpenerKeyword::Goal => TermType::Other,
            OpenerKeyword::Definition | OpenerKeyword::Example => TermType::Definition,
            OpenerKeyword::Instance => TermType::Instance,
        }
    }

    /// Term type of a definition keyword.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "Definition" | "Example" => TermType::Definition,
            "Fixpoint" | "CoFixpoint" => TermType::Fixpoint,
            "Inductive" | "CoInductive" | "Variant" => TermType::Inductive,
            "Record" | "Structure" => TermType::Record,
            "Class" => TermType::Class,
            "Instance" => TermType::Instance,
            "Ltac" => TermType::Tactic,
            _ => TermType::Other,
        }
    }
}

/// A named Coq entity with its defining sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// The defining sentence, whitespace-normalized
    pub text: String,

    /// Kind of the term
    #[serde(rename = "type")]
    pub term_type: TermType,

    /// Enclosing `Module`/`Section` names at the point of definition
    #[serde(default)]
    pub module_path: Vec<String>,

    /// Source range of the defining sentence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

impl Term {
    pub fn new(
        text: impl Into<String>,
        term_type: TermType,
        module_path: Vec<String>,
        range: Option<Range>,
    ) -> Self {
        Self {
            text: text.into(),
            term_type,
            module_path,
            range,
        }
    }
}

/// Collapse a step text into its sentence with single spaces.
///
/// Step texts carry leading whitespace and comments and may span lines;
/// recorded terms keep the sentence on one line.
pub fn normalized_sentence(text: &str) -> String {
    sentence_of(text).split_whitespace().collect::<Vec<_>>().join(" ")
}
