// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # File context
//!
//! [`FileContext`] accumulates the symbol table of a Coq source file as
//! the classified span stream is consumed in document order: fully
//! qualified terms, import aliases, and the ordered notation list, while
//! tracking the open `Module`/`Section` path.
//!
//! Name resolution is conservative: only terms defined in the file itself
//! are resolvable. Terms pulled in from other files via `Require` stay on
//! the server side; a failed lookup is not an error, the affected context
//! entry is simply absent.

use std::collections::{HashMap, HashSet};

use coq_proof_file_protocol::span::{NotationDef, SegmentKind, SpanKind};
use coq_proof_file_protocol::SpanReference;
use lsp_types::Range;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ContextError, ContextResult};
use crate::notation::{normalize_pattern, NotationEntry};
use crate::term::{normalized_sentence, Term, TermType};

/// One open `Module`, `Module Type` or `Section`.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    kind: SegmentKind,
    name: String,
}

/// Symbol table of one source file.
///
/// Every instance owns its containers; nothing is shared between files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileContext {
    /// Fully qualified name → term
    terms: HashMap<String, Term>,

    /// Short name → fully qualified name, from `Import`/`Export`
    aliases: HashMap<String, String>,

    /// Pattern notations in definition order
    notations: Vec<NotationEntry>,

    /// Open module/section stack
    segments: Vec<Segment>,
}

impl FileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all open segments, outermost first.
    pub fn segments_path(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.name.clone()).collect()
    }

    /// Whether the current position is inside a `Module Type`.
    pub fn in_module_type(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.kind == SegmentKind::ModuleType)
    }

    /// Module names only; sections do not qualify names.
    fn module_prefix(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Section)
            .map(|s| s.name.as_str())
            .collect()
    }

    fn qualify(&self, name: &str) -> String {
        let prefix = self.module_prefix();
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix.join("."), name)
        }
    }

    /// Absorb one classified sentence.
    pub fn process(&mut self, text: &str, kind: &SpanKind, range: Range) {
        match kind {
            SpanKind::Opener { keyword, name } => {
                if let Some(name) = name {
                    self.insert_term(name, &[], TermType::from_opener(*keyword), text, range);
                }
            }
            SpanKind::Definition {
                keyword,
                name,
                secondary,
                wheres,
                ..
            } => {
                if let Some(name) = name {
                    self.insert_term(name, secondary, TermType::from_keyword(keyword), text, range);
                }
                for notation in wheres {
                    self.push_notation(notation, range);
                }
            }
            SpanKind::Notation(def) => {
                if let Some(name) = &def.name {
                    // abbreviations are referenced by name, like terms
                    self.insert_term(name, &[], TermType::Notation, text, range);
                }
                if def.pattern.is_some() {
                    self.push_notation(def, range);
                }
            }
            SpanKind::Import {
                require, modules, ..
            } => {
                if !require {
                    for module in modules {
                        self.import_module(module);
                    }
                }
            }
            SpanKind::SegmentStart { kind, name } => {
                self.segments.push(Segment {
                    kind: *kind,
                    name: name.clone(),
                });
            }
            SpanKind::SegmentEnd { name } => {
                match self.segments.pop() {
                    Some(closed) => {
                        if let Some(name) = name {
                            if &closed.name != name {
                                warn!(
                                    "segment mismatch: closing {name}, innermost is {}",
                                    closed.name
                                );
                            }
                        }
                    }
                    None => warn!("End outside of any module or section"),
                }
                // Module contents stay under their qualified names; section
                // contents were never qualified and stay visible.
            }
            _ => {}
        }
    }

    fn insert_term(
        &mut self,
        name: &str,
        secondary: &[String],
        term_type: TermType,
        text: &str,
        range: Range,
    ) {
        let term = Term::new(
            normalized_sentence(text),
            term_type,
            self.segments_path(),
            Some(range),
        );
        let keys: Vec<String> = secondary
            .iter()
            .map(|secondary_name| self.qualify(secondary_name))
            .chain(std::iter::once(self.qualify(name)))
            .collect();
        for key in keys {
            self.terms.insert(key, term.clone());
        }
    }

    fn push_notation(&mut self, def: &NotationDef, range: Range) {
        let term = Term::new(
            normalized_sentence(&def.text),
            TermType::Notation,
            self.segments_path(),
            Some(range),
        );
        self.notations.push(NotationEntry {
            term,
            pattern: def.pattern.clone(),
            scope: def.scope.clone(),
        });
    }

    /// Alias every short name of an in-file module. The most recent import
    /// wins on conflicts, following Coq semantics.
    fn import_module(&mut self, module: &str) {
        let prefix = self.module_prefix();
        for depth in (0..=prefix.len()).rev() {
            let mut candidate = prefix[..depth].join(".");
            if !candidate.is_empty() {
                candidate.push('.');
            }
            candidate.push_str(module);
            candidate.push('.');

            let mut found = Vec::new();
            for key in self.terms.keys() {
                if let Some(rest) = key.strip_prefix(&candidate) {
                    if !rest.contains('.') {
                        found.push((rest.to_string(), key.clone()));
                    }
                }
            }
            if !found.is_empty() {
                for (short, target) in found {
                    self.aliases.insert(short, target);
                }
                return;
            }
        }
        // not defined in this file; the server resolves it from the workspace
        debug!("import of external module {module}");
    }

    /// Resolve a short or qualified name to a term.
    ///
    /// Resolution order: exact qualified name, aliases, then the enclosing
    /// module paths walked outward. As an approximation of `Locate`, a
    /// dotted name that resolves nowhere is retried with its final
    /// segment.
    pub fn lookup(&self, name: &str) -> Option<&Term> {
        if let Some(term) = self.terms.get(name) {
            return Some(term);
        }
        if let Some(target) = self.aliases.get(name) {
            if let Some(term) = self.terms.get(target) {
                return Some(term);
            }
        }
        let prefix = self.module_prefix();
        for depth in (1..=prefix.len()).rev() {
            let key = format!("{}.{}", prefix[..depth].join("."), name);
            if let Some(term) = self.terms.get(&key) {
                return Some(term);
            }
        }
        if let Some((_, last)) = name.rsplit_once('.') {
            return self.lookup(last);
        }
        None
    }

    /// Most recent notation matching `pattern` in `scope`.
    ///
    /// A notation delimited to the lookup scope beats every other match.
    /// Without one, the lookup behaves exactly like an empty-scope lookup
    /// and returns the most recently defined match of any scope.
    pub fn get_notation(&self, pattern: &str, scope: &str) -> ContextResult<&Term> {
        let lookup = normalize_pattern(pattern);
        let candidates: Vec<&NotationEntry> = self
            .notations
            .iter()
            .rev()
            .filter(|entry| entry.matches(&lookup))
            .collect();

        if !scope.is_empty() {
            if let Some(entry) = candidates
                .iter()
                .find(|entry| entry.scope.as_deref() == Some(scope))
            {
                return Ok(&entry.term);
            }
        }
        candidates
            .first()
            .map(|entry| &entry.term)
            .ok_or_else(|| ContextError::NotationNotFound {
                pattern: pattern.to_string(),
                scope: (!scope.is_empty()).then(|| scope.to_string()),
            })
    }

    /// The minimal referenced-term context of one span payload: every
    /// identifier and notation reference resolved through the table, in
    /// first-occurrence order, deduplicated by qualified name.
    ///
    /// Unresolvable references are skipped; lookup failures are not fatal
    /// for reads.
    pub fn step_references(&self, span: &Value) -> Vec<Term> {
        let mut seen = HashSet::new();
        let mut terms = Vec::new();
        for reference in coq_proof_file_protocol::collect_references(span) {
            let term = match &reference {
                SpanReference::Ident(name) => self.lookup(name),
                SpanReference::Notation(pattern) => self.get_notation(pattern, "").ok(),
            };
            if let Some(term) = term {
                let key = format!("{}::{}", term.module_path.join("."), term.text);
                if seen.insert(key) {
                    terms.push(term.clone());
                }
            }
        }
        terms
    }

    /// All recorded terms, keyed by fully qualified name.
    pub fn terms(&self) -> &HashMap<String, Term> {
        &self.terms
    }

    /// Import aliases, short name → fully qualified name.
    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    /// Pattern notations in definition order.
    pub fn notations(&self) -> &[NotationEntry] {
        &self.notations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coq_proof_file_protocol::classify;
    use lsp_types::Position;

    fn range() -> Range {
        Range::new(Position::new(0, 0), Position::new(0, 1))
    }

    fn absorb(context: &mut FileContext, sentence: &str) {
        let kind = classify(sentence, None);
        context.process(sentence, &kind, range());
    }

    #[test]
    fn test_plain_definition_is_recorded() {
        let mut context = FileContext::new();
        absorb(&mut context, "Definition double (n : nat) : nat := n + n.");
        let term = context.lookup("double").unwrap();
        assert_eq!(term.term_type, TermType::Definition);
        assert!(term.module_path.is_empty());
    }

    #[test]
    fn test_module_qualification() {
        let mut context = FileContext::new();
        absorb(&mut context, "Module Out.");
        absorb(&mut context, "Module In.");
        absorb(&mut context, "Theorem plus_O_n : forall n:nat, 0 + n = n.");
        absorb(&mut context, "End In.");
        absorb(&mut context, "End Out.");

        // fully qualified reference resolves from the outside
        let term = context.lookup("Out.In.plus_O_n").unwrap();
        assert_eq!(term.term_type, TermType::Theorem);
        assert_eq!(term.module_path, vec!["Out", "In"]);

        // the short name alone does not
        assert!(context.terms().get("plus_O_n").is_none());
    }

    #[test]
    fn test_inner_module_lookup_walks_outward() {
        let mut context = FileContext::new();
        absorb(&mut context, "Module Extra.");
        absorb(&mut context, "Module Fst.");
        absorb(&mut context, "Theorem plus_O_n : forall n:nat, n = 0 + n.");
        absorb(&mut context, "End Fst.");
        // still inside Extra: Fst.plus_O_n is reachable relatively
        let term = context.lookup("Fst.plus_O_n").unwrap();
        assert_eq!(term.module_path, vec!["Extra", "Fst"]);
    }

    #[test]
    fn test_section_does_not_qualify() {
        let mut context = FileContext::new();
        absorb(&mut context, "Section S1.");
        absorb(&mut context, "Definition inner : nat := 0.");
        absorb(&mut context, "End S1.");
        // section contents stay visible under their bare name
        let term = context.lookup("inner").unwrap();
        assert_eq!(term.module_path, vec!["S1"]);
    }

    #[test]
    fn test_import_aliases_short_names() {
        let mut context = FileContext::new();
        absorb(&mut context, "Module M.");
        absorb(&mut context, "Definition shared : nat := 1.");
        absorb(&mut context, "End M.");
        assert!(context.lookup("shared").is_none());

        absorb(&mut context, "Import M.");
        let term = context.lookup("shared").unwrap();
        assert_eq!(term.module_path, vec!["M"]);
        assert_eq!(context.aliases().get("shared").unwrap(), "M.shared");
    }

    #[test]
    fn test_import_conflict_most_recent_wins() {
        let mut context = FileContext::new();
        absorb(&mut context, "Module A.");
        absorb(&mut context, "Definition x : nat := 1.");
        absorb(&mut context, "End A.");
        absorb(&mut context, "Module B.");
        absorb(&mut context, "Inductive x : Set := mk : x.");
        absorb(&mut context, "End B.");

        absorb(&mut context, "Import A.");
        absorb(&mut context, "Import B.");
        assert_eq!(
            context.lookup("x").unwrap().term_type,
            TermType::Inductive
        );
    }

    #[test]
    fn test_constructors_index_their_inductive() {
        let mut context = FileContext::new();
        absorb(
            &mut context,
            "Inductive nat : Set := | O : nat | S : nat -> nat.",
        );
        let term = context.lookup("S").unwrap();
        assert_eq!(term.term_type, TermType::Inductive);
        assert_eq!(term.text, "Inductive nat : Set := | O : nat | S : nat -> nat.");
    }

    #[test]
    fn test_record_fields_index_their_record() {
        let mut context = FileContext::new();
        absorb(
            &mut context,
            "Record example := mk_example { fst : nat; snd : nat }.",
        );
        assert_eq!(
            context.lookup("mk_example").unwrap().term_type,
            TermType::Record
        );
        assert_eq!(context.lookup("fst").unwrap().term_type, TermType::Record);
    }

    #[test]
    fn test_abbreviation_is_a_term() {
        let mut context = FileContext::new();
        absorb(&mut context, "Notation plus := Nat.add (only parsing).");
        let term = context.lookup("plus").unwrap();
        assert_eq!(term.term_type, TermType::Notation);
        assert!(context.notations().is_empty());
    }

    #[test]
    fn test_dotted_fallback_to_last_segment() {
        let mut context = FileContext::new();
        absorb(
            &mut context,
            "Fixpoint add n m := match n with | 0 => m | S p => S (p + m) end where \"n + m\" := (add n m) : nat_scope.",
        );
        // `Nat.add` is not defined here; the final segment is
        let term = context.lookup("Nat.add").unwrap();
        assert_eq!(term.term_type, TermType::Fixpoint);
    }

    #[test]
    fn test_where_clause_registers_notation() {
        let mut context = FileContext::new();
        absorb(
            &mut context,
            "Fixpoint add n m := match n with | 0 => m | S p => S (p + m) end where \"n + m\" := (add n m) : nat_scope.",
        );
        let term = context.get_notation("_ + _", "nat_scope").unwrap();
        assert_eq!(term.text, "Notation \"n + m\" := (add n m) : nat_scope");
    }

    #[test]
    fn test_get_notation_scope_precedence() {
        let mut context = FileContext::new();
        absorb(&mut context, "Notation \"x = y\" := (eq x y) : type_scope.");
        absorb(&mut context, "Notation \"x = y\" := (int_eq x y) : int_scope.");

        // scoped match beats everything
        let scoped = context.get_notation("_ = _", "int_scope").unwrap();
        assert!(scoped.text.contains("int_eq"));

        // empty lookup scope: most recent match of any scope
        let any = context.get_notation("_ = _", "").unwrap();
        assert!(any.text.contains("int_eq"));

        // unknown scope: falls back to the most recent candidate
        let fallback = context.get_notation("_ = _", "bool_scope").unwrap();
        assert!(fallback.text.contains("int_eq"));
    }

    #[test]
    fn test_get_notation_foreign_scope_agrees_with_empty_lookup() {
        // unscoped oldest, foreign-scoped newest: a lookup with a scope
        // nothing is delimited to must agree with the empty-scope lookup
        let mut context = FileContext::new();
        absorb(&mut context, "Notation \"x = y\" := (eq x y).");
        absorb(&mut context, "Notation \"x = y\" := (int_eq x y) : int_scope.");

        let scoped = context.get_notation("_ = _", "bool_scope").unwrap();
        let empty = context.get_notation("_ = _", "").unwrap();
        assert_eq!(scoped, empty);
        assert!(scoped.text.contains("int_eq"));
    }

    #[test]
    fn test_get_notation_not_found() {
        let context = FileContext::new();
        let err = context.get_notation("{ _ }", "").unwrap_err();
        assert!(matches!(err, ContextError::NotationNotFound { .. }));
    }

    #[test]
    fn test_step_references_order_and_dedup() {
        let mut context = FileContext::new();
        absorb(
            &mut context,
            "Inductive nat : Set := | O : nat | S : nat -> nat.",
        );
        absorb(&mut context, "Lemma plus_O_n : forall n:nat, 0 + n = n.");
        absorb(&mut context, "Notation \"n * m\" := (mul n m) : nat_scope.");

        // rewrite -> (plus_O_n (S n * m)).
        let span = serde_json::json!([
            "CApp",
            ["CRef", ["Ser_Qualid", ["DirPath", []], ["Id", "plus_O_n"]], null],
            [[
                "CNotation",
                null,
                ["InConstrEntry", "_ * _"],
                [[
                    ["CApp",
                     ["CRef", ["Ser_Qualid", ["DirPath", []], ["Id", "S"]], null],
                     [["CRef", ["Ser_Qualid", ["DirPath", []], ["Id", "n"]], null]]],
                    ["CRef", ["Ser_Qualid", ["DirPath", []], ["Id", "m"]], null]
                ]]
            ]]
        ]);

        let terms = context.step_references(&span);
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[0].term_type, TermType::Lemma);
        assert_eq!(terms[1].term_type, TermType::Notation);
        assert_eq!(terms[2].term_type, TermType::Inductive);
    }

    #[test]
    fn test_module_type_detection() {
        let mut context = FileContext::new();
        absorb(&mut context, "Module Type Dep.");
        assert!(context.in_module_type());
        absorb(&mut context, "End Dep.");
        assert!(!context.in_module_type());
    }
}
