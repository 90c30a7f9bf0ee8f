// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Notation pattern matching
//!
//! Notations are matched by pattern and scope, not by name. A definition
//! pattern like `"n + m"` and a lookup pattern like `"_ + _"` both
//! normalize to the token sequence `_ + _`: placeholder identifiers map to
//! `_`, quoted keywords (`'exists'`) stay literal, and symbol tokens stay
//! as written.

/// A notation recorded by the context: the defining term plus the parsed
/// pattern and scope used for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct NotationEntry {
    pub term: crate::Term,

    /// Raw pattern as written in the definition (`"n + m"`)
    pub pattern: Option<String>,

    /// Delimiting scope (`nat_scope`); `None` matches any lookup scope
    pub scope: Option<String>,
}

impl NotationEntry {
    /// Whether this notation's pattern matches a lookup pattern.
    pub fn matches(&self, lookup: &[String]) -> bool {
        match &self.pattern {
            Some(pattern) => normalize_pattern(pattern) == lookup,
            None => false,
        }
    }
}

/// Normalize a notation pattern to its matching token sequence.
///
/// - `_` and `..` are kept as-is
/// - `'keyword'` quoted tokens become the literal keyword
/// - identifier tokens are placeholders and become `_`
/// - everything else (symbols, braces, commas) is literal
pub fn normalize_pattern(pattern: &str) -> Vec<String> {
    pattern
        .split_whitespace()
        .map(|token| {
            if token == "_" || token == ".." {
                return token.to_string();
            }
            if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
                return token[1..token.len() - 1].to_string();
            }
            if token
                .chars()
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
            {
                return "_".to_string();
            }
            token.to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Term, TermType};

    fn entry(pattern: &str, scope: Option<&str>) -> NotationEntry {
        NotationEntry {
            term: Term::new(
                format!("Notation \"{pattern}\" := …."),
                TermType::Notation,
                vec![],
                None,
            ),
            pattern: Some(pattern.to_string()),
            scope: scope.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_normalize_placeholders() {
        assert_eq!(normalize_pattern("n + m"), vec!["_", "+", "_"]);
        assert_eq!(normalize_pattern("x = y"), vec!["_", "=", "_"]);
        assert_eq!(normalize_pattern("_ * _"), vec!["_", "*", "_"]);
    }

    #[test]
    fn test_normalize_quoted_keyword() {
        assert_eq!(
            normalize_pattern("'exists' x .. y , p"),
            vec!["exists", "_", "..", "_", ",", "_"]
        );
    }

    #[test]
    fn test_normalize_brackets() {
        assert_eq!(normalize_pattern("[ x ]"), vec!["[", "_", "]"]);
        assert_eq!(
            normalize_pattern("[ x ; y ; .. ; z ]"),
            vec!["[", "_", ";", "_", ";", "..", ";", "_", "]"]
        );
    }

    #[test]
    fn test_entry_matches_lookup() {
        let plus = entry("n + m", Some("nat_scope"));
        assert!(plus.matches(&normalize_pattern("_ + _")));
        assert!(!plus.matches(&normalize_pattern("_ * _")));

        let exists = entry("'exists' x .. y , p", Some("type_scope"));
        assert!(exists.matches(&normalize_pattern("exists _ .. _ , _")));
    }

    #[test]
    fn test_sig_pattern_does_not_match_braces() {
        let sig = entry("{ x : A | P }", Some("type_scope"));
        assert!(!sig.matches(&normalize_pattern("{ _ }")));
    }
}
