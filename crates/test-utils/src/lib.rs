// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for coq-proof-file
//!
//! This crate provides common testing components including:
//! - A scripted `ProofServer` implementation that segments fixture text
//!   without a real `coq-lsp`
//! - Coq source fixtures and temp-file helpers
//! - A naive sentence scanner for fixtures
//! - YAML expected-proof definitions
//! - One-shot tracing setup for tests

pub mod expected;
pub mod fixtures;
pub mod logging;
pub mod scanner;
pub mod scripted;

// Re-exports for convenience
pub use expected::{parse_expected, ExpectedProof, ExpectedProofs, ExpectedStep, ExpectedTerm};
pub use fixtures::{write_fixture, CoqFixtures};
pub use logging::init_test_logging;
pub use scripted::ScriptedServer;
