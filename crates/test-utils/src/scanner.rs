// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Naive sentence scanner
//!
//! The scripted server needs to segment fixture sources the way the real
//! server would. This scanner is deliberately simple: a sentence ends at a
//! `.` followed by whitespace or end of file, skipping comments and
//! strings. Qualified names (`Nat.add`) stay whole because their inner
//! dots are followed by identifier characters.
//!
//! This is test tooling, not a Coq lexer.

use lsp_types::{Position, Range};

/// Byte ranges of the sentences in `text`, excluding leading whitespace.
pub fn sentence_ranges(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut start: Option<usize> = None;
    let mut comment = 0usize;
    let mut in_string = false;
    let mut i = 0usize;

    while i < bytes.len() {
        let rest = &text[i..];
        if comment > 0 {
            if rest.starts_with("(*") {
                comment += 1;
                i += 2;
            } else if rest.starts_with("*)") {
                comment -= 1;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        if in_string {
            if bytes[i] == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if rest.starts_with("(*") {
            comment += 1;
            i += 2;
            continue;
        }
        match bytes[i] {
            b'"' => {
                start.get_or_insert(i);
                in_string = true;
                i += 1;
            }
            b'.' => {
                let ends_sentence = start.is_some()
                    && bytes
                        .get(i + 1)
                        .map_or(true, |next| next.is_ascii_whitespace());
                if ends_sentence {
                    ranges.push((start.take().unwrap(), i + 1));
                }
                i += 1;
            }
            c if c.is_ascii_whitespace() => {
                i += 1;
            }
            _ => {
                start.get_or_insert(i);
                i += 1;
            }
        }
    }
    ranges
}

/// Line/character position of a byte offset, character-addressed.
pub fn position_at(text: &str, byte: usize) -> Position {
    let before = &text[..byte];
    let line = before.matches('\n').count() as u32;
    let character = before
        .rsplit_once('\n')
        .map_or(before.chars().count(), |(_, tail)| tail.chars().count())
        as u32;
    Position::new(line, character)
}

/// Source range of a byte range.
pub fn range_at(text: &str, start: usize, end: usize) -> Range {
    Range::new(position_at(text, start), position_at(text, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_sentences() {
        let text = "Example test1: 1 + 1 = 2.\nAdmitted.\n";
        let ranges = sentence_ranges(text);
        assert_eq!(ranges.len(), 2);
        assert_eq!(&text[ranges[0].0..ranges[0].1], "Example test1: 1 + 1 = 2.");
        assert_eq!(&text[ranges[1].0..ranges[1].1], "Admitted.");
    }

    #[test]
    fn test_qualified_names_stay_whole() {
        let text = "Print Nat.add.\n";
        let ranges = sentence_ranges(text);
        assert_eq!(ranges.len(), 1);
        assert_eq!(&text[ranges[0].0..ranges[0].1], "Print Nat.add.");
    }

    #[test]
    fn test_comments_and_strings_are_skipped() {
        let text = "(* a. b. *)\nNotation \"x . y\" := (pair x y).\n";
        let ranges = sentence_ranges(text);
        assert_eq!(ranges.len(), 1);
        assert!(text[ranges[0].0..ranges[0].1].starts_with("Notation"));
    }

    #[test]
    fn test_two_sentences_on_one_line() {
        let text = "intros. reflexivity.\n";
        let ranges = sentence_ranges(text);
        assert_eq!(ranges.len(), 2);
        assert_eq!(&text[ranges[0].0..ranges[0].1], "intros.");
        assert_eq!(&text[ranges[1].0..ranges[1].1], "reflexivity.");
    }

    #[test]
    fn test_position_at() {
        let text = "abc\ndef\n";
        assert_eq!(position_at(text, 0), Position::new(0, 0));
        assert_eq!(position_at(text, 3), Position::new(0, 3));
        assert_eq!(position_at(text, 4), Position::new(1, 0));
        assert_eq!(position_at(text, 7), Position::new(1, 3));
    }
}
