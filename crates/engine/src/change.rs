// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Change staging and validation
//!
//! Mutations never touch live state directly. An edit batch is first
//! *staged*: applied to a copy of the step texts, producing the new full
//! text, the origin of every resulting step position, and the adjusted
//! cursor. After the server re-checks the staged text, *validation*
//! compares the fresh step list against the stage:
//!
//! - the number of real sentences must match exactly (one new span per
//!   added step; whitespace- or comment-only additions produce none, two
//!   sentences produce two)
//! - every untouched step must be byte-identical (an addition that merges
//!   with its neighbors modifies them)
//! - no new diagnostic of severity Error may appear
//!
//! Only after validation passes does the engine promote the staged state.

use lsp_types::{Diagnostic, DiagnosticSeverity};

use coq_proof_file_protocol::GoalAnswer;

use crate::error::{EngineError, EngineResult};
use crate::step::Step;

/// One edit of a batch. Indices refer to the state as it is when the edit
/// is applied, in batch order.
#[derive(Debug, Clone, PartialEq)]
pub enum FileChange {
    /// Insert `text` so it becomes the step after `after_index`
    /// (`-1` inserts at the start of the file).
    Add { text: String, after_index: isize },

    /// Remove the step at `index`.
    Delete { index: usize },
}

/// Where a staged step position came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Origin {
    /// Unchanged step, by old index
    Old(usize),

    /// Step added by this batch
    New,
}

/// Result of applying a batch to a copy of the current state.
#[derive(Debug, Clone)]
pub struct StagedChange {
    /// The new full text
    pub text: String,

    /// Origin of every staged step position
    pub origins: Vec<Origin>,

    /// Expected number of real (non-synthetic) sentences after re-check
    pub expected_spans: usize,

    /// Earliest staged position touched by the batch
    pub earliest: usize,

    /// Cursor after the batch (edits before the cursor move it)
    pub steps_taken: usize,
}

/// Apply an edit batch to a copy of the step texts.
pub fn stage(steps: &[Step], edits: &[FileChange], steps_taken: usize) -> EngineResult<StagedChange> {
    let mut working: Vec<(String, Origin)> = steps
        .iter()
        .enumerate()
        .map(|(i, step)| (step.text.clone(), Origin::Old(i)))
        .collect();
    let mut cursor = steps_taken;
    let mut earliest = working.len();

    for edit in edits {
        match edit {
            FileChange::Add { text, after_index } => {
                if *after_index < -1 || *after_index >= working.len() as isize {
                    return Err(EngineError::InvalidAdd {
                        index: *after_index,
                        reason: format!(
                            "insertion point out of bounds (file has {} steps)",
                            working.len()
                        ),
                    });
                }
                let position = (*after_index + 1) as usize;
                working.insert(position, (text.clone(), Origin::New));
                if position < cursor {
                    cursor += 1;
                }
                earliest = earliest.min(position);
            }
            FileChange::Delete { index } => {
                if *index >= working.len() {
                    return Err(EngineError::InvalidDelete {
                        index: *index,
                        reason: format!(
                            "step index out of bounds (file has {} steps)",
                            working.len()
                        ),
                    });
                }
                working.remove(*index);
                if *index < cursor {
                    cursor -= 1;
                }
                earliest = earliest.min(*index);
            }
        }
    }

    let expected_spans = working
        .iter()
        .filter(|(_, origin)| match origin {
            Origin::Old(i) => !steps[*i].is_synthetic(),
            Origin::New => true,
        })
        .count();

    Ok(StagedChange {
        text: working.iter().map(|(text, _)| text.as_str()).collect(),
        origins: working.into_iter().map(|(_, origin)| origin).collect(),
        expected_spans,
        earliest,
        steps_taken: cursor,
    })
}

/// Diagnostics of severity Error.
pub fn error_diagnostics(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
    diagnostics
        .iter()
        .filter(|d| d.severity == Some(DiagnosticSeverity::ERROR))
        .collect()
}

/// Error diagnostics present in `new` but not in `old`, compared by range
/// and message.
pub fn new_error_diagnostics<'a>(old: &[Diagnostic], new: &'a [Diagnostic]) -> Vec<&'a Diagnostic> {
    let old_errors = error_diagnostics(old);
    error_diagnostics(new)
        .into_iter()
        .filter(|candidate| {
            !old_errors
                .iter()
                .any(|known| known.range == candidate.range && known.message == candidate.message)
        })
        .collect()
}

/// Check a re-checked step list against the stage. Returns the reason the
/// change is invalid, if any.
pub fn validate_staged(
    staged: &StagedChange,
    old_steps: &[Step],
    new_steps: &[Step],
    old_diagnostics: &[Diagnostic],
    new_diagnostics: &[Diagnostic],
) -> Result<(), String> {
    if let Some(diagnostic) = new_error_diagnostics(old_diagnostics, new_diagnostics).first() {
        return Err(format!("introduced an error: {}", diagnostic.message));
    }

    let real_spans = new_steps.iter().filter(|s| !s.is_synthetic()).count();
    if real_spans != staged.expected_spans {
        return Err(format!(
            "expected {} sentences after the change, the server found {}",
            staged.expected_spans, real_spans
        ));
    }

    // Positions align only up to the synthetic tail; compare pairwise.
    for (position, origin) in staged.origins.iter().enumerate() {
        let Origin::Old(old_index) = origin else {
            continue;
        };
        let Some(new_step) = new_steps.get(position) else {
            return Err("the change rearranged the sentence tail".to_string());
        };
        if new_step.text != old_steps[*old_index].text {
            return Err(format!(
                "modified an adjacent sentence (step {old_index})"
            ));
        }
    }

    Ok(())
}

/// Carry cached goal answers over to the staged step positions, dropping
/// everything from the earliest touched position onward.
pub fn splice_goals(
    goals: &[Option<GoalAnswer>],
    staged: &StagedChange,
) -> Vec<Option<GoalAnswer>> {
    staged
        .origins
        .iter()
        .enumerate()
        .map(|(position, origin)| match origin {
            Origin::Old(old_index) if position < staged.earliest => {
                goals.get(*old_index).cloned().flatten()
            }
            _ => None,
        })
        .collect()
}

/// Attribute a validation failure to the edit that caused it: the only
/// edit of a singleton batch, otherwise the batch as a whole.
pub fn attribute_failure(edits: &[FileChange], reason: String) -> EngineError {
    if edits.len() == 1 {
        match &edits[0] {
            FileChange::Add { after_index, .. } => EngineError::InvalidAdd {
                index: *after_index,
                reason,
            },
            FileChange::Delete { index } => EngineError::InvalidDelete {
                index: *index,
                reason,
            },
        }
    } else {
        EngineError::InvalidStep { reason }
    }
}
