// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Goal attachment
//!
//! For every step belonging to a proof, requests `proof/goals` at the
//! step's start position (the state *before* the sentence runs) and
//! records the answer in a vector parallel to the step list.
//!
//! On incremental changes only the suffix from the earliest touched step
//! is refetched; earlier steps keep their cached answers since their
//! geometry did not move. A server-side error inside an answer is kept on
//! the answer itself; steps outside any proof get no goals.

use lsp_types::Url;
use tracing::debug;

use coq_proof_file_gateway::ProofServer;
use coq_proof_file_protocol::GoalAnswer;

use crate::error::EngineResult;
use crate::grouper::ProofBlock;
use crate::step::Step;

/// Fill `goals[i]` for every proof-member step with index `from_index` or
/// later (or with no cached answer yet).
pub async fn attach_goals(
    server: &mut dyn ProofServer,
    uri: &Url,
    version: i32,
    steps: &[Step],
    blocks: &[ProofBlock],
    goals: &mut [Option<GoalAnswer>],
    from_index: usize,
) -> EngineResult<()> {
    let mut fetched = 0usize;
    for block in blocks {
        for seed in &block.steps {
            let index = seed.step_index;
            if index < from_index && goals[index].is_some() {
                continue;
            }
            let position = steps[index].ast.range.start;
            goals[index] = server.goals(uri, version, position).await?;
            fetched += 1;
        }
    }
    debug!("attached goals for {fetched} steps (from step {from_index})");
    Ok(())
}
