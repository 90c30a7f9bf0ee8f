// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Coq LSP protocol dialect
//!
//! This crate provides the wire types for the Coq-specific extensions of
//! the Language Server Protocol spoken by `coq-lsp`:
//!
//! - `proof/goals`: the goal state at a position ([`GoalAnswer`])
//! - `coq/getDocument`: the structured document view ([`FlecheDocument`])
//! - `$/coq/fileProgress`: checking progress ([`FileProgressParams`])
//!
//! Generic LSP structures (`Position`, `Range`, `Diagnostic`, …) come from
//! the `lsp-types` crate and are re-used as-is.
//!
//! The crate also owns the [`span`] module: a bounded structural probe of
//! the opaque span payload each [`RangedSpan`] carries, classifying a
//! sentence ([`SpanKind`]) and collecting the identifiers and notations it
//! references. Everything downstream (term context, proof grouping) works
//! from these probes instead of re-parsing Coq.

pub mod document;
pub mod goals;
pub mod span;

pub use document::{
    CompletionStatus, CompletionTag, FileProgressInfo, FileProgressKind, FileProgressParams,
    FlecheDocument, RangedSpan,
};
pub use goals::{Goal, GoalAnswer, GoalConfig, GoalRequest, Hyp, Message};
pub use span::{
    classify, collect_references, CloserKind, OpenerKeyword, SegmentKind, SpanKind, SpanReference,
};
