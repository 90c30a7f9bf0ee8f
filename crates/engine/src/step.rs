// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Step segmentation
//!
//! Builds the step list from the server's fleche document and the current
//! source text. Each step's text runs from the end of the previous span to
//! the end of its own span, so leading whitespace and comments belong to
//! the step that follows them and concatenating all step texts reproduces
//! the file byte for byte.
//!
//! Text not covered by any span (trailing whitespace at end of file) forms
//! a final synthetic step with no syntax descriptor.

use lsp_types::{Position, Range};
use ropey::Rope;

use coq_proof_file_protocol::{classify, FlecheDocument, RangedSpan, SpanKind};

use crate::error::{EngineError, EngineResult};

/// One sentence of the file, with its classified span.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Exact source substring, including leading whitespace and comments
    pub text: String,

    /// The server's span for the sentence
    pub ast: RangedSpan,

    /// Classified shape of the sentence
    pub kind: SpanKind,

    /// Byte offset where `text` starts
    offset: usize,

    /// Synthetic trailing step covering text after the last span
    synthetic: bool,
}

impl Step {
    /// Byte offset where this step's text starts.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte offset one past this step's text.
    pub fn end_offset(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Whether this is the synthetic trailing step.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// Character-addressed position to byte offset.
pub fn position_to_byte(rope: &Rope, position: Position) -> Option<usize> {
    let line = position.line as usize;
    if line >= rope.len_lines() {
        return None;
    }
    let char_index = rope.line_to_char(line) + position.character as usize;
    if char_index > rope.len_chars() {
        return None;
    }
    Some(rope.char_to_byte(char_index))
}

/// Position of the end of the text.
pub fn end_position(rope: &Rope) -> Position {
    let end_char = rope.len_chars();
    let line = rope.char_to_line(end_char);
    let character = end_char - rope.line_to_char(line);
    Position::new(line as u32, character as u32)
}

/// Build the ordered step list from a fleche document and the source text.
///
/// Fails with [`EngineError::Desync`] when a span lies outside the text or
/// spans are not in document order.
pub fn build_steps(document: &FlecheDocument, text: &str) -> EngineResult<Vec<Step>> {
    let rope = Rope::from_str(text);
    let mut steps = Vec::with_capacity(document.spans.len() + 1);
    let mut offset = 0usize;

    for span in &document.spans {
        let end = position_to_byte(&rope, span.range.end).ok_or_else(|| {
            EngineError::Desync(format!(
                "span end {:?} outside the document",
                span.range.end
            ))
        })?;
        if end < offset {
            return Err(EngineError::Desync(format!(
                "span ending at byte {end} overlaps the previous span at {offset}"
            )));
        }
        let step_text = text[offset..end].to_string();
        steps.push(Step {
            kind: classify(&step_text, span.span.as_ref()),
            text: step_text,
            ast: span.clone(),
            offset,
            synthetic: false,
        });
        offset = end;
    }

    if offset < text.len() {
        let start = steps
            .last()
            .map(|step| step.ast.range.end)
            .unwrap_or_else(|| Position::new(0, 0));
        steps.push(Step {
            text: text[offset..].to_string(),
            ast: RangedSpan {
                range: Range::new(start, end_position(&rope)),
                span: None,
            },
            kind: SpanKind::Other,
            offset,
            synthetic: true,
        });
    }

    Ok(steps)
}

/// Index of the step owning a byte offset, in `O(log n)`.
pub fn step_at_offset(steps: &[Step], offset: usize) -> Option<usize> {
    let index = steps.partition_point(|step| step.end_offset() <= offset);
    (index < steps.len() && offset >= steps[index].offset).then_some(index)
}
