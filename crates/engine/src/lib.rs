// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # coq-proof-file engine
//!
//! An interactive proof-file engine over a running `coq-lsp` server. The
//! engine exposes a structured view of a Coq source file: sentences
//! grouped into proofs, each step annotated with its goal state and the
//! terms it references, plus an incremental change API with atomic
//! rollback.
//!
//! ## Architecture
//!
//! ```text
//! ProofFile (façade)
//!     ├─→ ProofServer (gateway crate: coq-lsp over stdio)
//!     ├─→ step        (fleche document → step list)
//!     ├─→ grouper     (steps → term context + proof arena)
//!     ├─→ attacher    (proof/goals per step)
//!     └─→ change      (staging, validation, rollback)
//! ```
//!
//! On open, the gateway opens the file, the fleche document is segmented
//! into steps, the grouper builds the term context and proof arena in one
//! pass, and goals are attached per step. On mutation, the change module
//! stages the edit, the server re-checks the staged text, and the engine
//! either promotes the staged state (recomputing the affected suffix) or
//! reverts the server to the previous text and surfaces the failure.

pub mod attacher;
pub mod change;
pub mod config;
pub mod error;
pub mod grouper;
pub mod proof_file;
pub mod step;

pub use change::FileChange;
pub use config::ProofFileOptions;
pub use error::{EngineError, EngineResult};
pub use grouper::{Proof, ProofStep};
pub use proof_file::ProofFile;
pub use step::Step;

// Re-exports for downstream convenience
pub use coq_proof_file_context::{FileContext, Term, TermType};
pub use coq_proof_file_gateway::{ProofServer, ReadyStatus};
pub use coq_proof_file_protocol::{Goal, GoalAnswer, GoalConfig, Hyp};
