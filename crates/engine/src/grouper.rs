// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Proof grouping
//!
//! A single pass over the classified step stream builds the term context
//! and slices the steps into proofs:
//!
//! - an opener pushes a new proof; a nested opener suspends the enclosing
//!   one until the inner proof closes
//! - `Qed`/`Defined`/`Admitted`/`Save` close the innermost proof; `Abort`
//!   pops it without recording it as closed
//! - every other sentence inside a proof (including `Proof.`, bullets and
//!   nested commands) is appended as a proof step; the closer itself is
//!   not a step
//! - obligations open fresh proofs that share their `Program` definition's
//!   opener sentence and statement context
//! - proofs inside a `Module Type` are skipped entirely
//!
//! Proofs live in an arena indexed by creation order; nesting is expressed
//! with parent indices instead of back-pointers.

use std::collections::HashMap;

use tracing::debug;

use coq_proof_file_context::{normalized_sentence, FileContext, Term, TermType};
use coq_proof_file_protocol::span::{CloserKind, SpanKind};
use coq_proof_file_protocol::GoalAnswer;

use crate::step::Step;

/// One step of a proof, before goal attachment: the step index plus the
/// referenced-term context captured at that point of the pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofStepSeed {
    pub step_index: usize,
    pub context: Vec<Term>,
}

/// Arena entry for one proof.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofBlock {
    /// Step index of the opener sentence
    pub opener_index: usize,

    /// Opener sentence, whitespace-normalized
    pub text: String,

    /// Kind of the opener
    pub term_type: TermType,

    /// Terms referenced by the opener statement
    pub context: Vec<Term>,

    /// Inner steps in document order
    pub steps: Vec<ProofStepSeed>,

    /// Step index of the closer, once seen
    pub closer_index: Option<usize>,

    /// Closed by `Abort`: recorded in neither view once executed
    pub aborted: bool,

    /// Enclosing module/section names at the opener
    pub module_path: Vec<String>,

    /// Enclosing proof, for nested proofs
    pub parent: Option<usize>,
}

impl ProofBlock {
    /// Whether the closer has been executed under the given cursor.
    pub fn is_closed_at(&self, steps_taken: usize) -> bool {
        !self.aborted && self.closer_index.is_some_and(|c| c < steps_taken)
    }

    /// Whether the proof is open under the given cursor: opener executed,
    /// closer not yet.
    pub fn is_open_at(&self, steps_taken: usize) -> bool {
        self.opener_index < steps_taken
            && match self.closer_index {
                None => true,
                Some(c) => c >= steps_taken,
            }
    }
}

/// A proof as exposed by the façade: the opener plus its steps with goals
/// attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Proof {
    /// The opener sentence (e.g. `Theorem plus_O_n : …`)
    pub text: String,

    pub term_type: TermType,

    /// Terms referenced by the opener statement
    pub context: Vec<Term>,

    pub steps: Vec<ProofStep>,

    /// Terminated by `Qed`/`Defined`/`Admitted`/`Save`
    pub closed: bool,

    /// Enclosing module/section names at the opener
    pub module_path: Vec<String>,

    /// Step index of the opener sentence
    pub opener_index: usize,

    /// Arena index of the enclosing proof, for nested proofs
    pub parent: Option<usize>,
}

/// One step of a proof with its goal state and referenced terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofStep {
    pub text: String,

    /// Goal state at the step's start position; absent when the server had
    /// none
    pub goals: Option<GoalAnswer>,

    /// Terms whose definitions appear in the step, by first occurrence
    pub context: Vec<Term>,

    /// Index into the file's step list
    pub step_index: usize,
}

struct ProgramInfo {
    opener_index: usize,
    text: String,
    context: Vec<Term>,
    module_path: Vec<String>,
}

/// Walk the steps in document order, absorbing definitions into a fresh
/// [`FileContext`] and grouping proof regions into [`ProofBlock`]s.
pub fn analyze(steps: &[Step]) -> (FileContext, Vec<ProofBlock>) {
    let mut context = FileContext::new();
    let mut blocks: Vec<ProofBlock> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut programs: HashMap<String, ProgramInfo> = HashMap::new();
    let mut last_program: Option<String> = None;

    for (index, step) in steps.iter().enumerate() {
        // segments are absorbed after the transition below, so this sees
        // the state as of the previous sentence
        let in_module_type = context.in_module_type();
        let references = step
            .ast
            .span
            .as_ref()
            .map(|span| context.step_references(span))
            .unwrap_or_default();

        match &step.kind {
            SpanKind::Opener { keyword, name: _ } => {
                if !in_module_type {
                    let parent = open.last().copied();
                    blocks.push(ProofBlock {
                        opener_index: index,
                        text: normalized_sentence(&step.text),
                        term_type: TermType::from_opener(*keyword),
                        context: references.clone(),
                        steps: Vec::new(),
                        closer_index: None,
                        aborted: false,
                        module_path: context.segments_path(),
                        parent,
                    });
                    open.push(blocks.len() - 1);
                }
            }
            SpanKind::Closer { kind, .. } => {
                if !in_module_type {
                    match open.pop() {
                        Some(top) => {
                            blocks[top].closer_index = Some(index);
                            blocks[top].aborted = *kind == CloserKind::Abort;
                        }
                        None => debug!("closer at step {index} outside any proof"),
                    }
                }
            }
            SpanKind::Obligation { program } => {
                if !in_module_type {
                    let target = program.clone().or_else(|| last_program.clone());
                    let block = match target.as_deref().and_then(|name| programs.get(name)) {
                        Some(info) => ProofBlock {
                            opener_index: info.opener_index,
                            text: info.text.clone(),
                            term_type: TermType::Obligation,
                            context: info.context.clone(),
                            steps: Vec::new(),
                            closer_index: None,
                            aborted: false,
                            module_path: info.module_path.clone(),
                            parent: None,
                        },
                        None => ProofBlock {
                            opener_index: index,
                            text: normalized_sentence(&step.text),
                            term_type: TermType::Obligation,
                            context: references.clone(),
                            steps: Vec::new(),
                            closer_index: None,
                            aborted: false,
                            module_path: context.segments_path(),
                            parent: None,
                        },
                    };
                    blocks.push(block);
                    open.push(blocks.len() - 1);
                }
            }
            SpanKind::SegmentStart { .. } | SpanKind::SegmentEnd { .. } => {}
            SpanKind::Proof
            | SpanKind::Bullet
            | SpanKind::Other
            | SpanKind::Definition { .. }
            | SpanKind::Notation(_)
            | SpanKind::Import { .. } => {
                if !in_module_type && !step.is_synthetic() {
                    if let Some(&top) = open.last() {
                        blocks[top].steps.push(ProofStepSeed {
                            step_index: index,
                            context: references.clone(),
                        });
                    }
                }
            }
        }

        // `Program` definitions become the opener of their obligations
        if let SpanKind::Definition {
            name: Some(name),
            program: true,
            ..
        } = &step.kind
        {
            programs.insert(
                name.clone(),
                ProgramInfo {
                    opener_index: index,
                    text: normalized_sentence(&step.text),
                    context: references.clone(),
                    module_path: context.segments_path(),
                },
            );
            last_program = Some(name.clone());
        }

        context.process(&step.text, &step.kind, step.ast.range);
    }

    (context, blocks)
}
