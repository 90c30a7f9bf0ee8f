// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Span classification and reference probing
//!
//! The server delivers each sentence's syntax as an opaque JSON blob. This
//! module performs the two bounded probes the engine needs:
//!
//! - [`classify`] labels a sentence as proof opener, closer, tactic,
//!   definition, notation, import, module boundary, obligation or other.
//!   The probe prefers the vernacular tag embedded in the span payload and
//!   falls back to the sentence text, so classification degrades
//!   gracefully when the server omits the syntax descriptor.
//! - [`collect_references`] walks a span payload in depth-first order and
//!   collects the qualified identifiers and notation patterns the sentence
//!   references, in first-occurrence order.
//!
//! Nothing here parses Coq: both probes only recognize a fixed set of
//! structural shapes and keywords.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Keyword of a proof-opening sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenerKeyword {
    Theorem,
    Lemma,
    Remark,
    Fact,
    Corollary,
    Proposition,
    Property,
    Goal,
    Definition,
    Example,
    Instance,
}

impl OpenerKeyword {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "Theorem" => Some(Self::Theorem),
            "Lemma" => Some(Self::Lemma),
            "Remark" => Some(Self::Remark),
            "Fact" => Some(Self::Fact),
            "Corollary" => Some(Self::Corollary),
            "Proposition" => Some(Self::Proposition),
            "Property" => Some(Self::Property),
            "Goal" => Some(Self::Goal),
            "Definition" => Some(Self::Definition),
            "Example" => Some(Self::Example),
            "Instance" => Some(Self::Instance),
            _ => None,
        }
    }
}

/// Kind of a proof-closing sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloserKind {
    Qed,
    Defined,
    Admitted,
    Save,
    Abort,
}

/// Kind of a module-like segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Module,
    ModuleType,
    Section,
}

/// A notation introduced by a sentence: either an abbreviation
/// (`Notation plus := Nat.add`) with a `name`, or a pattern notation
/// (`Notation "n + m" := …`) with a `pattern` and optional `scope`.
#[derive(Debug, Clone, PartialEq)]
pub struct NotationDef {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub scope: Option<String>,

    /// The sentence (or `where`-clause fragment) defining the notation
    pub text: String,
}

/// Classified shape of one sentence span.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanKind {
    /// Sentence that opens a proof (`Theorem`, `Goal`, bodiless
    /// `Definition`, `Instance`, …)
    Opener {
        keyword: OpenerKeyword,
        name: Option<String>,
    },

    /// `Proof.` and its `with`/`using` variants
    Proof,

    /// `Qed.` / `Defined.` / `Admitted.` / `Save id.` / `Abort.`
    Closer {
        kind: CloserKind,
        name: Option<String>,
    },

    /// Term-defining sentence with a body (`Definition x := …`,
    /// `Fixpoint`, `Inductive`, `Record`, `Class`, `Ltac`, …)
    Definition {
        keyword: String,
        name: Option<String>,
        /// Constructor, field or method names indexing to the same term
        secondary: Vec<String>,
        /// `Program` definitions generate obligations
        program: bool,
        /// Notations introduced by `where` clauses
        wheres: Vec<NotationDef>,
    },

    /// `Notation` / `Infix` sentence
    Notation(NotationDef),

    /// `Require` / `Import` / `Export`
    Import {
        require: bool,
        export: bool,
        modules: Vec<String>,
    },

    /// `Module` / `Module Type` / `Section` opening
    SegmentStart { kind: SegmentKind, name: String },

    /// `End name.`
    SegmentEnd { name: Option<String> },

    /// `Obligation N [of id].` / `Next Obligation [of id].`
    Obligation { program: Option<String> },

    /// Bullets (`-`, `+`, `*`, …) and focusing braces
    Bullet,

    /// Anything else; inside a proof this is a tactic step
    Other,
}

/// A reference collected from a span payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanReference {
    /// Possibly-qualified identifier (`plus_O_n`, `Out.In.plus_O_n`)
    Ident(String),
    /// Notation application pattern (`_ + _`)
    Notation(String),
}

fn ident_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_']*").expect("static regex"))
}

/// Skip leading whitespace and (possibly nested) `(* … *)` comments,
/// returning the sentence proper.
pub fn sentence_of(text: &str) -> &str {
    let mut rest = text.trim_start();
    while let Some(stripped) = rest.strip_prefix("(*") {
        let mut depth = 1usize;
        let mut chars = stripped.char_indices().peekable();
        let mut end = stripped.len();
        while let Some((i, c)) = chars.next() {
            match c {
                '(' if stripped[i..].starts_with("(*") => {
                    depth += 1;
                    chars.next();
                }
                '*' if stripped[i..].starts_with("*)") => {
                    depth -= 1;
                    chars.next();
                    if depth == 0 {
                        end = i + 2;
                        break;
                    }
                }
                _ => {}
            }
        }
        rest = stripped[end.min(stripped.len())..].trim_start();
    }
    rest
}

/// Strip attributes (`#[…]`) and visibility modifiers, reporting whether a
/// `Program` modifier was present.
fn strip_modifiers(sentence: &str) -> (&str, bool) {
    let mut rest = sentence.trim_start();
    let mut program = false;
    loop {
        if let Some(stripped) = rest.strip_prefix("#[") {
            match stripped.find(']') {
                Some(end) => rest = stripped[end + 1..].trim_start(),
                None => break,
            }
            continue;
        }
        let mut advanced = false;
        for modifier in ["Local", "Global", "Polymorphic", "Monomorphic", "Cumulative"] {
            if let Some(stripped) = rest.strip_prefix(modifier) {
                if stripped.starts_with(char::is_whitespace) {
                    rest = stripped.trim_start();
                    advanced = true;
                    break;
                }
            }
        }
        if advanced {
            continue;
        }
        if let Some(stripped) = rest.strip_prefix("Program") {
            if stripped.starts_with(char::is_whitespace) {
                program = true;
                rest = stripped.trim_start();
                continue;
            }
        }
        break;
    }
    (rest, program)
}

/// Scan for `:=` at top level, outside comments, strings and parentheses.
fn has_top_level_assign(sentence: &str) -> bool {
    top_level_find(sentence, ":=").is_some()
}

/// Byte offset of `needle` at paren/comment/string depth zero.
fn top_level_find(sentence: &str, needle: &str) -> Option<usize> {
    let bytes = sentence.as_bytes();
    let mut depth = 0i32;
    let mut comment = 0i32;
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        let rest = &sentence[i..];
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
            if rest.starts_with('"') {
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
            b'"' => in_string = true,
            b'(' | b'{' | b'[' => depth += 1,
            b')' | b'}' | b']' => depth -= 1,
            _ => {
                if depth == 0 && rest.starts_with(needle) {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

fn leading_ident(s: &str) -> Option<String> {
    ident_regex()
        .find(s.trim_start())
        .map(|m| m.as_str().to_string())
}

/// First `"…"` quoted chunk of a sentence.
fn first_quoted(s: &str) -> Option<String> {
    let start = s.find('"')? + 1;
    let end = s[start..].find('"')? + start;
    Some(s[start..end].to_string())
}

/// Trailing `: scope` after the last top-level colon, when the tail is a
/// bare identifier.
fn scope_suffix(sentence: &str) -> Option<String> {
    let trimmed = sentence.trim_end().trim_end_matches('.').trim_end();
    let mut last = None;
    let mut offset = 0;
    while let Some(found) = top_level_find(&trimmed[offset..], ":") {
        let absolute = offset + found;
        // skip `:=` and `::`
        if trimmed[absolute..].starts_with(":=") || trimmed[absolute..].starts_with("::") {
            offset = absolute + 2;
            continue;
        }
        last = Some(absolute);
        offset = absolute + 1;
    }
    let tail = trimmed[last? + 1..].trim();
    let ident = ident_regex().find(tail)?;
    (ident.as_str().len() == tail.len()).then(|| tail.to_string())
}

/// Parse `where "pattern" := body [: scope]` clauses of a definition.
fn where_notations(sentence: &str) -> Vec<NotationDef> {
    let mut notations = Vec::new();
    let mut offset = 0;
    while let Some(found) = top_level_find(&sentence[offset..], "where") {
        let absolute = offset + found;
        let after = &sentence[absolute + "where".len()..];
        offset = absolute + "where".len();
        let trimmed = after.trim_start();
        if !trimmed.starts_with('"') {
            continue;
        }
        // fragment runs to the next `where` clause or the final period
        let fragment_end = top_level_find(trimmed, "where")
            .or_else(|| top_level_find(trimmed, "."))
            .unwrap_or(trimmed.len());
        let fragment = trimmed[..fragment_end].trim_end();
        let pattern = first_quoted(fragment);
        let scope = scope_suffix(fragment);
        notations.push(NotationDef {
            name: None,
            pattern,
            scope,
            text: format!("Notation {fragment}"),
        });
    }
    notations
}

/// Constructor names of an `Inductive`-like body: first identifier of each
/// top-level `|` branch after `:=`.
fn constructor_names(sentence: &str) -> Vec<String> {
    let Some(assign) = top_level_find(sentence, ":=") else {
        return Vec::new();
    };
    let body = &sentence[assign + 2..];
    let body = match top_level_find(body, "where") {
        Some(end) => &body[..end],
        None => body,
    };
    let mut names = Vec::new();
    let mut rest = body;
    loop {
        let branch_end = top_level_find(rest, "|").unwrap_or(rest.len());
        let branch = rest[..branch_end].trim().trim_end_matches('.').trim();
        if !branch.is_empty() {
            if let Some(name) = leading_ident(branch) {
                names.push(name);
            }
        }
        if branch_end == rest.len() {
            break;
        }
        rest = &rest[branch_end + 1..];
    }
    names
}

/// Constructor, field and method names of a `Record`/`Class` body:
/// optional build constructor before `{`, then the head of each `;`
/// separated member.
fn record_names(sentence: &str) -> Vec<String> {
    let Some(assign) = top_level_find(sentence, ":=") else {
        return Vec::new();
    };
    let body = sentence[assign + 2..].trim_start();
    let mut names = Vec::new();
    let brace = body.find('{');
    let head = brace.map_or(body, |b| &body[..b]);
    if let Some(constructor) = leading_ident(head) {
        names.push(constructor);
    }
    let Some(brace) = brace else { return names };
    let inner_end = body.rfind('}').unwrap_or(body.len());
    let inner = &body[brace + 1..inner_end];
    for member in split_top_level(inner, ';') {
        if let Some(name) = leading_ident(member.trim()) {
            names.push(name);
        }
    }
    names
}

fn split_top_level(s: &str, separator: char) -> Vec<&str> {
    let needle = separator.to_string();
    let mut pieces = Vec::new();
    let mut rest = s;
    loop {
        match top_level_find(rest, &needle) {
            Some(found) => {
                pieces.push(&rest[..found]);
                rest = &rest[found + needle.len()..];
            }
            None => {
                pieces.push(rest);
                return pieces;
            }
        }
    }
}

fn is_bullet(sentence: &str) -> bool {
    let trimmed = sentence.trim().trim_end_matches('.');
    if trimmed == "{" || trimmed == "}" {
        return true;
    }
    !trimmed.is_empty()
        && (trimmed.chars().all(|c| c == '-')
            || trimmed.chars().all(|c| c == '+')
            || trimmed.chars().all(|c| c == '*'))
}

/// Bounded search of the span payload for the first `["Id", name]` node;
/// definition vernaculars serialize the defined name there.
fn probe_first_id(span: &Value) -> Option<String> {
    fn walk(value: &Value, budget: &mut usize) -> Option<String> {
        if *budget == 0 {
            return None;
        }
        *budget -= 1;
        if let Some(name) = id_string(value) {
            return Some(name);
        }
        match value {
            Value::Array(items) => items.iter().find_map(|item| walk(item, budget)),
            Value::Object(map) => map.values().find_map(|item| walk(item, budget)),
            _ => None,
        }
    }
    walk(span, &mut 128)
}

/// Bounded search of the span payload for the vernacular tag string.
fn probe_vernac_tag(span: &Value) -> Option<&str> {
    fn walk<'a>(value: &'a Value, budget: &mut usize) -> Option<&'a str> {
        if *budget == 0 {
            return None;
        }
        *budget -= 1;
        match value {
            Value::String(s) if s.starts_with("Vernac") => Some(s.as_str()),
            Value::Array(items) => items.iter().find_map(|item| walk(item, budget)),
            Value::Object(map) => map.values().find_map(|item| walk(item, budget)),
            _ => None,
        }
    }
    walk(span, &mut 256)
}

/// Classify one sentence from its text and (when present) span payload.
///
/// `text` is the step text, possibly carrying leading whitespace and
/// comments; `span` is the opaque payload of the corresponding
/// [`crate::RangedSpan`].
pub fn classify(text: &str, span: Option<&Value>) -> SpanKind {
    let sentence = sentence_of(text);
    let (head, program) = strip_modifiers(sentence);

    if sentence.is_empty() {
        return SpanKind::Other;
    }
    if is_bullet(sentence) {
        return SpanKind::Bullet;
    }

    let first = leading_ident(head).unwrap_or_default();
    let after_first = head[first.len()..].trim_start();

    // defined names come from the syntax descriptor when it carries one,
    // with the sentence text as fallback
    let defined_name = || {
        span.and_then(probe_first_id)
            .or_else(|| leading_ident(after_first))
    };

    match first.as_str() {
        "Proof" => return SpanKind::Proof,
        "Qed" => {
            return SpanKind::Closer {
                kind: CloserKind::Qed,
                name: None,
            }
        }
        "Defined" => {
            return SpanKind::Closer {
                kind: CloserKind::Defined,
                name: None,
            }
        }
        "Admitted" => {
            return SpanKind::Closer {
                kind: CloserKind::Admitted,
                name: None,
            }
        }
        "Abort" => {
            return SpanKind::Closer {
                kind: CloserKind::Abort,
                name: None,
            }
        }
        "Save" => {
            return SpanKind::Closer {
                kind: CloserKind::Save,
                name: leading_ident(after_first),
            }
        }
        "Require" | "Import" | "Export" => {
            let require = first == "Require";
            let mut rest = after_first;
            let mut export = first == "Export";
            if require {
                if let Some(stripped) = rest.strip_prefix("Import") {
                    rest = stripped.trim_start();
                } else if let Some(stripped) = rest.strip_prefix("Export") {
                    export = true;
                    rest = stripped.trim_start();
                }
            }
            let modules = rest
                .trim_end()
                .trim_end_matches('.')
                .split_whitespace()
                .map(|token| token.to_string())
                .collect();
            return SpanKind::Import {
                require,
                export,
                modules,
            };
        }
        "Module" => {
            if leading_ident(after_first).as_deref() == Some("Type") {
                let rest = after_first.trim_start()["Type".len()..].trim_start();
                if let Some(name) = leading_ident(rest) {
                    return SpanKind::SegmentStart {
                        kind: SegmentKind::ModuleType,
                        name,
                    };
                }
            }
            // module aliases (`Module M := N.`) do not open a segment
            if !has_top_level_assign(head) {
                if let Some(name) = leading_ident(after_first) {
                    return SpanKind::SegmentStart {
                        kind: SegmentKind::Module,
                        name,
                    };
                }
            }
            return SpanKind::Other;
        }
        "Section" => {
            if let Some(name) = leading_ident(after_first) {
                return SpanKind::SegmentStart {
                    kind: SegmentKind::Section,
                    name,
                };
            }
            return SpanKind::Other;
        }
        "End" => {
            return SpanKind::SegmentEnd {
                name: leading_ident(after_first),
            }
        }
        "Obligation" => {
            // `Obligation Tactic := …` is a setting, not a proof opener
            if after_first.starts_with(|c: char| c.is_ascii_digit()) {
                return SpanKind::Obligation {
                    program: obligation_target(after_first),
                };
            }
            return SpanKind::Other;
        }
        "Next" => {
            if let Some(rest) = after_first.strip_prefix("Obligation") {
                return SpanKind::Obligation {
                    program: obligation_target(rest),
                };
            }
            return SpanKind::Other;
        }
        "Notation" => {
            let def = if after_first.starts_with('"') {
                NotationDef {
                    name: None,
                    pattern: first_quoted(after_first),
                    scope: scope_suffix(sentence),
                    text: sentence.to_string(),
                }
            } else {
                NotationDef {
                    name: leading_ident(after_first),
                    pattern: None,
                    scope: scope_suffix(sentence),
                    text: sentence.to_string(),
                }
            };
            return SpanKind::Notation(def);
        }
        "Infix" => {
            let pattern = first_quoted(after_first).map(|op| format!("_ {op} _"));
            return SpanKind::Notation(NotationDef {
                name: None,
                pattern,
                scope: scope_suffix(sentence),
                text: sentence.to_string(),
            });
        }
        "Ltac" => {
            return SpanKind::Definition {
                keyword: first,
                name: defined_name(),
                secondary: Vec::new(),
                program,
                wheres: Vec::new(),
            }
        }
        "Fixpoint" | "CoFixpoint" => {
            return SpanKind::Definition {
                keyword: first,
                name: defined_name(),
                secondary: Vec::new(),
                program,
                wheres: where_notations(head),
            }
        }
        "Inductive" | "CoInductive" | "Variant" => {
            return SpanKind::Definition {
                keyword: first,
                name: defined_name(),
                secondary: constructor_names(head),
                program,
                wheres: where_notations(head),
            }
        }
        "Record" | "Structure" | "Class" => {
            return SpanKind::Definition {
                keyword: first,
                name: defined_name(),
                secondary: record_names(head),
                program,
                wheres: Vec::new(),
            }
        }
        _ => {}
    }

    if let Some(keyword) = OpenerKeyword::from_token(&first) {
        let name = match keyword {
            OpenerKeyword::Goal => None,
            _ => defined_name(),
        };
        // `Definition`/`Example` with a body define a term; `Program`
        // variants generate obligations instead of opening a proof here.
        let definition_like =
            matches!(keyword, OpenerKeyword::Definition | OpenerKeyword::Example);
        if definition_like && (program || has_top_level_assign(head)) {
            return SpanKind::Definition {
                keyword: first,
                name,
                secondary: Vec::new(),
                program,
                wheres: Vec::new(),
            };
        }
        return SpanKind::Opener { keyword, name };
    }

    // Text probe came up empty; fall back to the span tag for the shapes
    // where the text is uninformative.
    if let Some(tag) = span.and_then(probe_vernac_tag) {
        match tag {
            "VernacProof" => return SpanKind::Proof,
            "VernacBullet" | "VernacSubproof" | "VernacEndSubproof" => return SpanKind::Bullet,
            "VernacEndProof" => {
                return SpanKind::Closer {
                    kind: CloserKind::Qed,
                    name: None,
                }
            }
            "VernacAbort" => {
                return SpanKind::Closer {
                    kind: CloserKind::Abort,
                    name: None,
                }
            }
            _ => {}
        }
    }

    SpanKind::Other
}

/// Parse the `of <id>` suffix of an obligation sentence.
fn obligation_target(rest: &str) -> Option<String> {
    let rest = rest
        .trim_start()
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start();
    let rest = rest.strip_prefix("of")?;
    leading_ident(rest)
}

/// Collect identifier and notation references from a span payload in
/// depth-first, first-occurrence order.
pub fn collect_references(span: &Value) -> Vec<SpanReference> {
    let mut references = Vec::new();
    walk_references(span, &mut references);
    references
}

fn walk_references(value: &Value, out: &mut Vec<SpanReference>) {
    match value {
        Value::Array(items) => {
            if let Some(Value::String(tag)) = items.first() {
                match tag.as_str() {
                    "Ser_Qualid" => {
                        if let Some(name) = parse_qualid(items) {
                            out.push(SpanReference::Ident(name));
                            return;
                        }
                    }
                    "CNotation" => {
                        if let Some(pattern) = notation_pattern(items) {
                            out.push(SpanReference::Notation(pattern));
                        }
                        for item in &items[1..] {
                            walk_references(item, out);
                        }
                        return;
                    }
                    _ => {}
                }
            }
            for item in items {
                walk_references(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                walk_references(item, out);
            }
        }
        _ => {}
    }
}

/// Rebuild a dotted name from a `Ser_Qualid` node:
/// `["Ser_Qualid", ["DirPath", [["Id","Out"], ["Id","In"]]], ["Id","x"]]`
/// becomes `Out.In.x`.
fn parse_qualid(items: &[Value]) -> Option<String> {
    let mut segments: Vec<String> = Vec::new();
    for item in &items[1..] {
        let Value::Array(parts) = item else { continue };
        match parts.first() {
            Some(Value::String(tag)) if tag == "DirPath" => {
                if let Some(Value::Array(ids)) = parts.get(1) {
                    for id in ids {
                        if let Some(segment) = id_string(id) {
                            segments.push(segment);
                        }
                    }
                }
            }
            Some(Value::String(tag)) if tag == "Id" => {
                if let Some(segment) = id_string(item) {
                    segments.push(segment);
                }
            }
            _ => {}
        }
    }
    (!segments.is_empty()).then(|| segments.join("."))
}

fn id_string(value: &Value) -> Option<String> {
    let Value::Array(parts) = value else {
        return None;
    };
    match (parts.first(), parts.get(1)) {
        (Some(Value::String(tag)), Some(Value::String(name))) if tag == "Id" => {
            Some(name.clone())
        }
        _ => None,
    }
}

/// The application pattern of a `CNotation` node, preferring the
/// `InConstrEntry` wrapper the server emits.
fn notation_pattern(items: &[Value]) -> Option<String> {
    fn find(value: &Value, budget: &mut usize) -> Option<String> {
        if *budget == 0 {
            return None;
        }
        *budget -= 1;
        match value {
            Value::Array(parts) => {
                if let (Some(Value::String(tag)), Some(Value::String(pattern))) =
                    (parts.first(), parts.get(1))
                {
                    if tag == "InConstrEntry" {
                        return Some(pattern.clone());
                    }
                }
                parts.iter().find_map(|part| find(part, budget))
            }
            Value::Object(map) => map.values().find_map(|part| find(part, budget)),
            _ => None,
        }
    }
    items[1..].iter().find_map(|item| find(item, &mut 64))
}
