// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # The proof-file façade
//!
//! [`ProofFile`] owns the server session and every piece of derived state
//! for one Coq source file: the step list, the term context, the grouped
//! proofs with attached goals, the published diagnostics, and the
//! execution cursor.
//!
//! ## Mutation protocol
//!
//! Every mutation stages the edit on a copy, pushes the staged full text
//! to the server, waits for checking to settle, and validates the fresh
//! structured document against the stage. When the change is valid,
//! the affected suffix of proofs and goals is recomputed and the file is
//! written back byte-exact. Invalid changes are rolled back by pushing
//! the previous text again; in-memory state is untouched and only the
//! diagnostics of the failed attempt are kept.
//!
//! The step-oriented API (`add_step`/`delete_step`) refuses edits outside
//! any proof: those would invalidate the whole accumulated term context.
//! `change_steps` accepts them.

use std::path::{Path, PathBuf};

use lsp_types::{Diagnostic, Url};
use tracing::{debug, info, warn};

use coq_proof_file_context::FileContext;
use coq_proof_file_gateway::{CoqLspClient, ProofServer, ReadyStatus};
use coq_proof_file_protocol::GoalAnswer;

use crate::attacher::attach_goals;
use crate::change::{
    attribute_failure, error_diagnostics, new_error_diagnostics, splice_goals, stage,
    validate_staged, FileChange,
};
use crate::config::ProofFileOptions;
use crate::error::{EngineError, EngineResult};
use crate::grouper::{analyze, Proof, ProofBlock, ProofStep};
use crate::step::{build_steps, Step};

/// An open Coq source file with its proofs, contexts and goals.
pub struct ProofFile {
    server: Box<dyn ProofServer>,
    uri: Url,
    path: PathBuf,
    version: i32,
    text: String,
    steps: Vec<Step>,
    context: FileContext,
    blocks: Vec<ProofBlock>,
    goals: Vec<Option<GoalAnswer>>,
    /// Server truth for the current committed text
    diagnostics: Vec<Diagnostic>,
    /// Records of failed change attempts; never part of the validation
    /// baseline, or a repeat of the same invalid edit would slip through
    failure_log: Vec<Diagnostic>,
    steps_taken: usize,
    is_valid: bool,
}

impl ProofFile {
    /// Open a file with a freshly spawned `coq-lsp`.
    pub async fn open(path: impl AsRef<Path>, options: ProofFileOptions) -> EngineResult<Self> {
        let server = CoqLspClient::spawn(
            &options.server_path,
            &options.server_args,
            options.workspace.as_deref(),
            options.timeout,
        )
        .await?;
        Self::with_server(Box::new(server), path).await
    }

    /// Open a file over an existing server session. This is the seam the
    /// tests use to substitute a scripted server.
    pub async fn with_server(
        mut server: Box<dyn ProofServer>,
        path: impl AsRef<Path>,
    ) -> EngineResult<Self> {
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let text = tokio::fs::read_to_string(&path).await?;
        let uri = Url::from_file_path(&path)
            .map_err(|_| EngineError::Desync(format!("unrepresentable path: {}", path.display())))?;

        info!("opening {uri}");
        server.open(&uri, &text).await?;
        let status = server.await_ready(&uri, 1).await?;
        let document = server.fleche_document(&uri, 1).await?;
        let diagnostics = server.diagnostics(&uri);
        let steps = build_steps(&document, &text)?;
        let is_valid = status == ReadyStatus::Ok && error_diagnostics(&diagnostics).is_empty();
        if !is_valid {
            warn!("{uri} opened with errors; mutations will be refused");
        }

        let (context, blocks) = analyze(&steps);
        let mut goals = vec![None; steps.len()];
        attach_goals(server.as_mut(), &uri, 1, &steps, &blocks, &mut goals, 0).await?;

        let steps_taken = steps.len();
        Ok(Self {
            server,
            uri,
            path,
            version: 1,
            text,
            steps,
            context,
            blocks,
            goals,
            diagnostics,
            failure_log: Vec::new(),
            steps_taken,
            is_valid,
        })
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    /// All sentences of the file, in document order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The accumulated term context.
    pub fn context(&self) -> &FileContext {
        &self.context
    }

    /// Latest diagnostics, including records of failed change attempts.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .iter()
            .chain(self.failure_log.iter())
            .cloned()
            .collect()
    }

    /// Whether the file checked without errors at open.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// The execution cursor: how many steps are considered taken.
    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    /// Path of the underlying source file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Document URI.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Closed proofs, ordered by the position of their closer.
    pub fn proofs(&self) -> Vec<Proof> {
        let mut closed: Vec<&ProofBlock> = self
            .blocks
            .iter()
            .filter(|block| block.is_closed_at(self.steps_taken))
            .collect();
        closed.sort_by_key(|block| block.closer_index);
        closed
            .iter()
            .map(|block| self.materialize(block, true))
            .collect()
    }

    /// Proofs whose closer has not been executed, in document order.
    pub fn open_proofs(&self) -> Vec<Proof> {
        self.blocks
            .iter()
            .filter(|block| block.is_open_at(self.steps_taken))
            .map(|block| self.materialize(block, false))
            .collect()
    }

    /// Advance (or rewind, for negative `n`) the execution cursor by `n`
    /// steps. Only the `proofs`/`open_proofs` split is affected; the text
    /// is untouched. Returns the new cursor.
    pub fn exec(&mut self, n: isize) -> usize {
        let target = (self.steps_taken as isize)
            .saturating_add(n)
            .clamp(0, self.steps.len() as isize);
        self.steps_taken = target as usize;
        debug!("cursor at {}/{} steps", self.steps_taken, self.steps.len());
        self.steps_taken
    }

    fn materialize(&self, block: &ProofBlock, closed: bool) -> Proof {
        Proof {
            text: block.text.clone(),
            term_type: block.term_type,
            context: block.context.clone(),
            steps: block
                .steps
                .iter()
                .map(|seed| ProofStep {
                    text: self.steps[seed.step_index].text.clone(),
                    goals: self.goals.get(seed.step_index).cloned().flatten(),
                    context: seed.context.clone(),
                    step_index: seed.step_index,
                })
                .collect(),
            closed,
            module_path: block.module_path.clone(),
            opener_index: block.opener_index,
            parent: block.parent,
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Insert one sentence so that it becomes the step after
    /// `after_index`. The text must parse as exactly one sentence and must
    /// not disturb its neighbors.
    pub async fn add_step(&mut self, after_index: isize, text: impl Into<String>) -> EngineResult<()> {
        self.ensure_valid()?;
        if !self.region_allows_add(after_index) {
            return Err(EngineError::NotImplemented {
                reason: format!(
                    "adding after step {after_index} falls outside any proof; use change_steps"
                ),
            });
        }
        self.apply(&[FileChange::Add {
            text: text.into(),
            after_index,
        }])
        .await
    }

    /// Remove the step at `index`.
    pub async fn delete_step(&mut self, index: usize) -> EngineResult<()> {
        self.ensure_valid()?;
        if !self.region_allows_delete(index) {
            return Err(EngineError::NotImplemented {
                reason: format!(
                    "deleting step {index} falls outside any proof; use change_steps"
                ),
            });
        }
        self.apply(&[FileChange::Delete { index }]).await
    }

    /// Apply an ordered batch of edits atomically. Indices refer to the
    /// state as it is when each edit applies. Unlike the step-oriented
    /// API, edits outside proofs are supported.
    pub async fn change_steps(&mut self, edits: &[FileChange]) -> EngineResult<()> {
        self.ensure_valid()?;
        self.apply(edits).await
    }

    /// Write the current text to disk and notify the server.
    pub async fn save(&mut self) -> EngineResult<()> {
        tokio::fs::write(&self.path, &self.text).await?;
        self.server.save(&self.uri, &self.text).await?;
        Ok(())
    }

    /// Tear down the server session.
    pub async fn close(mut self) -> EngineResult<()> {
        let close = self.server.close(&self.uri).await;
        self.server.shutdown().await?;
        close?;
        Ok(())
    }

    fn ensure_valid(&self) -> EngineResult<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(EngineError::InvalidFile {
                reason: "the file contains errors; fix it before editing".to_string(),
            })
        }
    }

    fn region_allows_add(&self, after_index: isize) -> bool {
        self.blocks.iter().any(|block| {
            after_index >= block.opener_index as isize
                && block
                    .closer_index
                    .map_or(true, |closer| after_index < closer as isize)
        })
    }

    fn region_allows_delete(&self, index: usize) -> bool {
        self.blocks.iter().any(|block| {
            index >= block.opener_index
                && block.closer_index.map_or(true, |closer| index <= closer)
        })
    }

    async fn apply(&mut self, edits: &[FileChange]) -> EngineResult<()> {
        let staged = stage(&self.steps, edits, self.steps_taken)?;
        debug!(
            "staging {} edit(s), earliest touched step {}",
            edits.len(),
            staged.earliest
        );

        self.version += 1;
        self.server
            .change(&self.uri, self.version, &staged.text)
            .await?;
        let status = self.server.await_ready(&self.uri, self.version).await?;
        let document = self.server.fleche_document(&self.uri, self.version).await?;
        let new_diagnostics = self.server.diagnostics(&self.uri);

        let outcome: Result<Vec<Step>, String> = match build_steps(&document, &staged.text) {
            Err(e) => Err(e.to_string()),
            Ok(new_steps) => validate_staged(
                &staged,
                &self.steps,
                &new_steps,
                &self.diagnostics,
                &new_diagnostics,
            )
            .and_then(|()| {
                if status == ReadyStatus::Failed {
                    Err("the server failed to process the change".to_string())
                } else {
                    Ok(new_steps)
                }
            }),
        };

        match outcome {
            Ok(new_steps) => {
                let mut goals = splice_goals(&self.goals, &staged);
                self.text = staged.text;
                self.steps = new_steps;
                let (context, blocks) = analyze(&self.steps);
                self.context = context;
                self.blocks = blocks;
                goals.resize(self.steps.len(), None);
                self.goals = goals;
                attach_goals(
                    self.server.as_mut(),
                    &self.uri,
                    self.version,
                    &self.steps,
                    &self.blocks,
                    &mut self.goals,
                    staged.earliest,
                )
                .await?;
                self.diagnostics = new_diagnostics;
                self.steps_taken = staged.steps_taken;
                tokio::fs::write(&self.path, &self.text).await?;
                self.server.save(&self.uri, &self.text).await?;
                Ok(())
            }
            Err(reason) => {
                warn!("change rejected: {reason}; rolling back");
                let failures: Vec<Diagnostic> =
                    new_error_diagnostics(&self.diagnostics, &new_diagnostics)
                        .into_iter()
                        .cloned()
                        .collect();

                self.version += 1;
                self.server
                    .change(&self.uri, self.version, &self.text)
                    .await?;
                self.server.await_ready(&self.uri, self.version).await?;

                // keep a bounded record of the failed attempt
                self.failure_log.extend(failures);
                Err(attribute_failure(edits, reason))
            }
        }
    }
}
