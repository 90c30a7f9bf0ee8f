// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Term context for Coq proof files
//!
//! This crate accumulates the symbol table of a Coq source file as its
//! sentences are consumed in document order:
//!
//! - **terms**: fully qualified name → [`Term`] (definitions, inductives,
//!   lemmas, tactics, abbreviations, …), with constructor/field names
//!   indexing to their parent term
//! - **aliases**: short name → fully qualified name, maintained by
//!   `Import`/`Export` with most-recent-wins conflict resolution
//! - **notations**: the ordered pattern-notation list, matched by
//!   normalized pattern and scope rather than by name
//!
//! The open `Module`/`Section` path is tracked so definitions are
//! qualified at their point of definition and resolvable by short name,
//! alias, or any enclosing path walked outward.

pub mod context;
pub mod error;
pub mod notation;
pub mod term;

pub use context::FileContext;
pub use error::{ContextError, ContextResult};
pub use notation::{normalize_pattern, NotationEntry};
pub use term::{normalized_sentence, Term, TermType};
