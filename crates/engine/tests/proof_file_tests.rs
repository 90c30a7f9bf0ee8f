// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Read-side integration tests: opening a file, proof grouping, goal
//! attachment and term contexts, over the scripted server.

use serde_json::json;

use coq_proof_file_engine::{EngineError, Goal, GoalConfig, ProofFile, TermType};
use coq_proof_file_test_utils::{
    init_test_logging, parse_expected, write_fixture, CoqFixtures, ScriptedServer,
};

async fn open_fixture(name: &str, content: &str, server: ScriptedServer) -> ProofFile {
    init_test_logging();
    let path = write_fixture(name, content);
    ProofFile::with_server(Box::new(server), &path)
        .await
        .expect("fixture should open")
}

async fn cleanup(proof_file: ProofFile) {
    let path = proof_file.path().to_path_buf();
    proof_file.close().await.unwrap();
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_get_proofs() {
    let proof_file = open_fixture(
        "valid",
        CoqFixtures::valid_file(),
        ScriptedServer::new(),
    )
    .await;

    let proofs = proof_file.proofs();
    assert_eq!(proofs.len(), 4);
    assert!(proof_file.open_proofs().is_empty());
    assert!(proof_file.is_valid());

    assert_eq!(
        proofs[0].text,
        "Theorem plus_O_n : forall n:natl, 0 + n = n."
    );
    assert_eq!(proofs[0].term_type, TermType::Theorem);
    let texts: Vec<&str> = proofs[0].steps.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "\nProof.",
            "\n      intros n.",
            "\n      Print plus.",
            "\n      reduce_eq.",
        ]
    );

    assert_eq!(
        proofs[1].text,
        "Definition mult_0_plus : forall n m : natl, 0 + (S n * m) = S n * m."
    );
    assert_eq!(proofs[1].term_type, TermType::Definition);

    // the Admitted proof still counts as closed
    assert_eq!(
        proofs[3].text,
        "Theorem mult_0_plus_inv : forall n m : natl, S n * m = 0 + (S n * m)."
    );
    assert!(proofs[3].closed);

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_goals_are_attached_at_step_start() {
    let proof_file = open_fixture(
        "valid_goals",
        CoqFixtures::valid_file(),
        ScriptedServer::new(),
    )
    .await;

    for proof in proof_file.proofs() {
        for step in &proof.steps {
            let answer = step
                .goals
                .as_ref()
                .unwrap_or_else(|| panic!("missing goals for {:?}", step.text));
            let ast_start = proof_file.steps()[step.step_index].ast.range.start;
            assert_eq!(answer.position, ast_start);
            assert!(answer.goals.is_some());
        }
    }

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_step_context_references() {
    // span payload of `rewrite -> (plus_O_n (S n * m)).`
    let rewrite_ast = json!([
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
    // span payload of `Print plus.`
    let print_ast = json!([
        "VernacPrint",
        ["CRef", ["Ser_Qualid", ["DirPath", []], ["Id", "plus"]], null]
    ]);

    let server = ScriptedServer::new()
        .with_ast("rewrite -> (plus_O_n (S n * m)).", rewrite_ast)
        .with_ast("Print plus.", print_ast);
    let proof_file = open_fixture("valid_ctx", CoqFixtures::valid_file(), server).await;

    let proofs = proof_file.proofs();

    let rewrite_step = proofs[1]
        .steps
        .iter()
        .find(|s| s.text.contains("rewrite"))
        .unwrap();
    let kinds: Vec<TermType> = rewrite_step.context.iter().map(|t| t.term_type).collect();
    assert_eq!(
        kinds,
        vec![TermType::Theorem, TermType::Notation, TermType::Inductive]
    );
    assert!(rewrite_step.context[0].text.starts_with("Theorem plus_O_n"));
    assert_eq!(
        rewrite_step.context[1].text,
        "Notation \"n * m\" := (mul n m) : nat_scope."
    );
    assert!(rewrite_step.context[2].text.starts_with("Inductive natl"));

    let print_step = proofs[0]
        .steps
        .iter()
        .find(|s| s.text.contains("Print plus"))
        .unwrap();
    assert_eq!(print_step.context.len(), 1);
    assert_eq!(
        print_step.context[0].text,
        "Notation plus := add (only parsing)."
    );
    assert_eq!(print_step.context[0].term_type, TermType::Notation);

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_text_fidelity_and_range_coverage() {
    let proof_file = open_fixture(
        "fidelity",
        CoqFixtures::valid_file(),
        ScriptedServer::new(),
    )
    .await;

    // concatenating all step texts reproduces the file byte for byte
    let rebuilt: String = proof_file.steps().iter().map(|s| s.text.as_str()).collect();
    assert_eq!(rebuilt, CoqFixtures::valid_file());

    // steps are sorted and contiguous
    for pair in proof_file.steps().windows(2) {
        assert_eq!(pair[0].end_offset(), pair[1].offset());
        assert!(pair[0].ast.range.end <= pair[1].ast.range.start);
    }

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_nested_proofs_grouping() {
    let proof_file = open_fixture(
        "nested",
        CoqFixtures::nested_proofs(),
        ScriptedServer::new(),
    )
    .await;

    let proofs = proof_file.proofs();
    assert_eq!(proofs.len(), 4);
    assert!(proof_file.open_proofs().is_empty());

    // closed in close order: inner before its outer
    assert_eq!(proofs[0].text, "Theorem inner1 : True.");
    assert_eq!(proofs[1].text, "Theorem outer1 : True.");
    assert_eq!(proofs[2].text, "Theorem inner2 : True.");
    assert_eq!(proofs[3].text, "Theorem outer2 : True.");

    // the outer proof's steps skip the nested region
    let outer_texts: Vec<&str> = proofs[1].steps.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(outer_texts, vec!["\nProof.", "\ntrivial."]);
    assert_eq!(proofs[0].parent, Some(0));

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_exec_reopens_nested_proofs() {
    let mut proof_file = open_fixture(
        "nested_exec",
        CoqFixtures::nested_proofs(),
        ScriptedServer::new(),
    )
    .await;

    assert_eq!(proof_file.proofs().len(), 4);
    assert_eq!(proof_file.open_proofs().len(), 0);

    // the last two steps are the closers of the second pair
    proof_file.exec(-2);
    assert_eq!(proof_file.proofs().len(), 2);
    assert_eq!(proof_file.open_proofs().len(), 2);

    proof_file.exec(2);
    assert_eq!(proof_file.proofs().len(), 4);
    assert_eq!(proof_file.open_proofs().len(), 0);
    assert_eq!(proof_file.steps_taken(), proof_file.steps().len());

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_obligations_share_the_program_sentence() {
    let proof_file = open_fixture(
        "obligations",
        CoqFixtures::obligations(),
        ScriptedServer::new(),
    )
    .await;

    let proofs = proof_file.proofs();
    assert_eq!(proofs.len(), 2);
    for proof in &proofs {
        assert_eq!(
            proof.text,
            "Program Definition id (n : nat) : { x : nat | x = n } := if dec (leb n 0) then 0%nat else S (pred n)."
        );
        assert_eq!(proof.term_type, TermType::Obligation);
        assert_eq!(proof.steps.len(), 1);
        assert_eq!(proof.steps[0].text, "\n  dummy_tactic n e.");
    }

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_module_type_proofs_are_ignored() {
    let proof_file = open_fixture(
        "module_type",
        CoqFixtures::module_type(),
        ScriptedServer::new(),
    )
    .await;

    let proofs = proof_file.proofs();
    assert_eq!(proofs.len(), 1);
    assert_eq!(proofs[0].text, "Lemma kept : True.");

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_theorem_tokens() {
    let proof_file = open_fixture(
        "tokens",
        CoqFixtures::theorem_tokens(),
        ScriptedServer::new(),
    )
    .await;

    let kinds: Vec<TermType> = proof_file
        .proofs()
        .iter()
        .map(|p| p.term_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TermType::Remark,
            TermType::Fact,
            TermType::Corollary,
            TermType::Proposition,
            TermType::Property,
            TermType::Theorem,
            TermType::Lemma,
        ]
    );

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_non_ending_proof() {
    let proof_file = open_fixture(
        "open_proof",
        CoqFixtures::change_empty(),
        ScriptedServer::new(),
    )
    .await;

    assert!(proof_file.proofs().is_empty());
    let open = proof_file.open_proofs();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].text, "Lemma change_empty : forall n:nat, 0 + n = n.");
    assert!(!open[0].closed);

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_module_path_of_proofs() {
    let proof_file = open_fixture(
        "imports",
        CoqFixtures::imports(),
        ScriptedServer::new(),
    )
    .await;

    let proofs = proof_file.proofs();
    assert_eq!(proofs.len(), 2);
    assert_eq!(proofs[0].module_path, vec!["Out", "In"]);
    assert!(proofs[1].module_path.is_empty());

    // the theorem is recorded fully qualified
    assert!(proof_file
        .context()
        .lookup("Out.In.plus_O_n")
        .is_some());

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_invalid_file_refuses_mutations() {
    let server = ScriptedServer::new().with_error(
        "invalid_tactic",
        "The reference invalid_tactic was not found",
    );
    let mut proof_file = open_fixture("invalid", CoqFixtures::invalid_file(), server).await;

    assert!(!proof_file.is_valid());
    assert_eq!(proof_file.diagnostics().len(), 1);

    let add = proof_file.add_step(0, "\ntrivial.").await;
    assert!(matches!(add, Err(EngineError::InvalidFile { .. })));
    let delete = proof_file.delete_step(1).await;
    assert!(matches!(delete, Err(EngineError::InvalidFile { .. })));
    // even an empty batch is refused
    let batch = proof_file.change_steps(&[]).await;
    assert!(matches!(batch, Err(EngineError::InvalidFile { .. })));

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_matches_yaml_expectation() {
    let yaml = r#"
proofs:
  - text: "Theorem plus_O_n : forall n:natl, 0 + n = n."
    type: THEOREM
    steps:
      - text: "\nProof."
      - text: "\n      intros n."
      - text: "\n      Print plus."
      - text: "\n      reduce_eq."
  - text: "Definition mult_0_plus : forall n m : natl, 0 + (S n * m) = S n * m."
    type: DEFINITION
"#;
    let expected = parse_expected(yaml).unwrap();
    let proof_file = open_fixture(
        "yaml_expect",
        CoqFixtures::valid_file(),
        ScriptedServer::new(),
    )
    .await;

    let proofs = proof_file.proofs();
    for (want, got) in expected.proofs.iter().zip(&proofs) {
        assert_eq!(want.text, got.text);
        if let Some(term_type) = want.term_type {
            assert_eq!(term_type, got.term_type);
        }
        if !want.steps.is_empty() {
            assert_eq!(want.steps.len(), got.steps.len());
            for (want_step, got_step) in want.steps.iter().zip(&got.steps) {
                assert_eq!(want_step.text, got_step.text);
            }
        }
    }

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_scripted_goal_rules_flow_through() {
    let server = ScriptedServer::new().with_goal(
        "intros n.",
        GoalConfig::focused(vec![Goal::new(vec![], "forall n : natl, 0 + n = n")]),
    );
    let proof_file = open_fixture("goal_rules", CoqFixtures::valid_file(), server).await;

    let proofs = proof_file.proofs();
    let intros = proofs[0]
        .steps
        .iter()
        .find(|s| s.text.contains("intros n."))
        .unwrap();
    let config = intros.goals.as_ref().unwrap().goals.as_ref().unwrap();
    assert_eq!(config.goals[0].ty, "forall n : natl, 0 + n = n");

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_failed_processing_marks_file_invalid() {
    let server = ScriptedServer::new().with_failed_processing();
    let mut proof_file = open_fixture("failed_open", CoqFixtures::simple_file(), server).await;

    assert!(!proof_file.is_valid());
    let result = proof_file.change_steps(&[]).await;
    assert!(matches!(result, Err(EngineError::InvalidFile { .. })));

    cleanup(proof_file).await;
}

#[tokio::test]
async fn test_reopen_round_trip() {
    let path = write_fixture("round_trip", CoqFixtures::valid_file());
    let first = ProofFile::with_server(Box::new(ScriptedServer::new()), &path)
        .await
        .unwrap();
    let first_proofs = first.proofs();
    let first_steps: Vec<String> = first.steps().iter().map(|s| s.text.clone()).collect();
    first.close().await.unwrap();

    let second = ProofFile::with_server(Box::new(ScriptedServer::new()), &path)
        .await
        .unwrap();
    let second_steps: Vec<String> = second.steps().iter().map(|s| s.text.clone()).collect();
    assert_eq!(first_steps, second_steps);
    assert_eq!(first_proofs, second.proofs());
    second.close().await.unwrap();

    let _ = std::fs::remove_file(path);
}
