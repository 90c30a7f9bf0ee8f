// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # `coq/getDocument` and `$/coq/fileProgress` wire types
//!
//! The fleche document is the server's authoritative structured view of a
//! source file: the list of sentence spans it segmented, plus a completion
//! status describing how far checking got. Progress notifications stream
//! in while the server processes a version; an empty `processing` list
//! signals that the version is fully checked.

use lsp_types::{Range, VersionedTextDocumentIdentifier};
use serde::{Deserialize, Serialize};

/// One sentence span of the fleche document.
///
/// `span` is the server's abstract syntax descriptor for the sentence. It
/// is treated as opaque except for the bounded probes in [`crate::span`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedSpan {
    /// Source range of the sentence (0-based line/character)
    pub range: Range,

    /// Opaque syntax descriptor; absent for some spans (e.g. whitespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<serde_json::Value>,
}

/// How far the server got checking the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionTag {
    Yes,
    Stopped,
    Failed,
}

/// Completion status of a fleche document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionStatus {
    pub status: CompletionTag,
    pub range: Range,
}

/// The `coq/getDocument` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlecheDocument {
    pub spans: Vec<RangedSpan>,
    pub completed: CompletionStatus,
}

impl FlecheDocument {
    /// Whether the server finished checking this version, successfully or
    /// not.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.completed.status,
            CompletionTag::Yes | CompletionTag::Failed
        )
    }
}

/// Kind of a file-progress entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FileProgressKind {
    Processing,
    FatalError,
}

impl TryFrom<u8> for FileProgressKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FileProgressKind::Processing),
            2 => Ok(FileProgressKind::FatalError),
            other => Err(format!("unknown file progress kind: {other}")),
        }
    }
}

impl From<FileProgressKind> for u8 {
    fn from(kind: FileProgressKind) -> u8 {
        match kind {
            FileProgressKind::Processing => 1,
            FileProgressKind::FatalError => 2,
        }
    }
}

/// One entry of a progress notification: a range still being processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProgressInfo {
    pub range: Range,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FileProgressKind>,
}

/// Parameters of the `$/coq/fileProgress` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProgressParams {
    #[serde(rename = "textDocument")]
    pub text_document: VersionedTextDocumentIdentifier,

    /// Ranges still pending; empty once the version is fully checked
    pub processing: Vec<FileProgressInfo>,
}

impl FileProgressParams {
    /// Whether this notification marks the version as fully processed.
    pub fn is_done(&self) -> bool {
        self.processing.is_empty()
    }

    /// Whether the server reported a fatal error for some range.
    pub fn has_fatal_error(&self) -> bool {
        self.processing
            .iter()
            .any(|info| info.kind == Some(FileProgressKind::FatalError))
    }
}
