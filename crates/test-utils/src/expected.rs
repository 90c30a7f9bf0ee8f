// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # YAML expected-proof definitions
//!
//! Test expectations for whole proof structures are written as YAML and
//! parsed into these types, keeping bulky literals out of the test code.

use serde::Deserialize;

use coq_proof_file_context::TermType;

/// Top-level expected structure of a file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedProofs {
    pub proofs: Vec<ExpectedProof>,
}

/// Expected shape of one proof.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedProof {
    /// The opener sentence
    pub text: String,

    /// Kind of the opener, when asserted
    #[serde(default, rename = "type")]
    pub term_type: Option<TermType>,

    #[serde(default)]
    pub steps: Vec<ExpectedStep>,

    /// Expected statement context
    #[serde(default)]
    pub context: Vec<ExpectedTerm>,
}

/// Expected shape of one proof step.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedStep {
    pub text: String,

    /// Expected conclusion of the first focused goal
    #[serde(default)]
    pub goal: Option<String>,

    #[serde(default)]
    pub context: Vec<ExpectedTerm>,
}

/// Expected referenced term.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedTerm {
    pub text: String,

    #[serde(rename = "type")]
    pub term_type: TermType,

    #[serde(default)]
    pub module: Vec<String>,
}

/// Parse an expected-proofs document.
pub fn parse_expected(yaml: &str) -> Result<ExpectedProofs, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}
