// Copyright (c) 2025 coq-proof-file contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Coq source fixtures
//!
//! Sample Coq files for engine tests, written so the naive sentence
//! scanner segments them exactly like the real server would.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Sample Coq sources.
pub struct CoqFixtures;

impl CoqFixtures {
    /// A valid file with four proofs: two plain theorems, a bodiless
    /// `Definition` proved interactively, and an `Admitted` one.
    pub const fn valid_file() -> &'static str {
        "Inductive natl : Set := | O : natl | S : natl -> natl.\n\
         Fixpoint add n m := match n with | O => m | S p => S (p + m) end where \"n + m\" := (add n m) : nat_scope.\n\
         Notation \"x = y\" := (eq x y) : type_scope.\n\
         Notation \"n * m\" := (mul n m) : nat_scope.\n\
         Notation plus := add (only parsing).\n\
         Ltac reduce_eq := simpl; reflexivity.\n\
         \n\
         Theorem plus_O_n : forall n:natl, 0 + n = n.\n\
         Proof.\n\
         \x20     intros n.\n\
         \x20     Print plus.\n\
         \x20     reduce_eq.\n\
         Qed.\n\
         \n\
         Definition mult_0_plus : forall n m : natl, 0 + (S n * m) = S n * m.\n\
         Proof.\n\
         \x20   intros n m.\n\
         \x20   rewrite -> (plus_O_n (S n * m)).\n\
         \x20   reflexivity.\n\
         Qed.\n\
         \n\
         Theorem plus_O_n_inv : forall n:natl, n = 0 + n.\n\
         Proof.\n\
         \x20     intros n.\n\
         \x20     reduce_eq.\n\
         Qed.\n\
         \n\
         Theorem mult_0_plus_inv : forall n m : natl, S n * m = 0 + (S n * m).\n\
         Proof.\n\
         \x20     intros n m.\n\
         \x20     reflexivity.\n\
         Admitted.\n"
    }

    /// Four closed proofs named for the delete-Qed scenario.
    pub const fn delete_qed() -> &'static str {
        "Theorem delete_qed : forall n:nat, 0 + n = n.\n\
         Proof.\n\
         trivial.\n\
         Qed.\n\
         Theorem delete_qed2 : forall n:nat, 0 + n = n.\n\
         Proof.\n\
         trivial.\n\
         Qed.\n\
         Theorem delete_qed3 : forall n:nat, 0 + n = n.\n\
         Proof.\n\
         trivial.\n\
         Qed.\n\
         Theorem delete_qed4 : forall n:nat, 0 + n = n.\n\
         Proof.\n\
         trivial.\n\
         Qed.\n"
    }

    /// Two nested pairs of proofs; the final two steps are the closers of
    /// the second pair, so rewinding the cursor by two reopens both.
    pub const fn nested_proofs() -> &'static str {
        "Theorem outer1 : True.\n\
         Proof.\n\
         Theorem inner1 : True.\n\
         Proof.\n\
         trivial.\n\
         Qed.\n\
         trivial.\n\
         Qed.\n\
         Theorem outer2 : True.\n\
         Proof.\n\
         Theorem inner2 : True.\n\
         Proof.\n\
         trivial.\n\
         Qed.\n\
         Qed."
    }

    /// A `Program Definition` with two obligations.
    pub const fn obligations() -> &'static str {
        "Program Definition id (n : nat) : { x : nat | x = n } := if dec (leb n 0) then 0%nat else S (pred n).\n\
         Next Obligation.\n\
         \x20 dummy_tactic n e.\n\
         Qed.\n\
         Next Obligation.\n\
         \x20 dummy_tactic n e.\n\
         Qed.\n"
    }

    /// Proofs inside a `Module Type` are skipped; one proof outside.
    pub const fn module_type() -> &'static str {
        "Module Type Overridable.\n\
         Lemma ignored : True.\n\
         Proof.\n\
         Admitted.\n\
         End Overridable.\n\
         \n\
         Lemma kept : True.\n\
         Proof.\n\
         trivial.\n\
         Qed.\n"
    }

    /// One proof per theorem-family keyword.
    pub const fn theorem_tokens() -> &'static str {
        "Remark r : True.\nProof.\ntrivial.\nQed.\n\
         Fact f : True.\nProof.\ntrivial.\nQed.\n\
         Corollary c : True.\nProof.\ntrivial.\nQed.\n\
         Proposition p : True.\nProof.\ntrivial.\nQed.\n\
         Property pr : True.\nProof.\ntrivial.\nQed.\n\
         Theorem t : True.\nProof.\ntrivial.\nQed.\n\
         Lemma l : True.\nProof.\ntrivial.\nQed.\n"
    }

    /// Two small examples, used by the batch-change tests.
    pub const fn simple_file() -> &'static str {
        "Example test1: 1 + 1 = 2.\n\
         Proof.\n\
         reflexivity.\n\
         Qed.\n\
         \n\
         Example test2: 1 + 1 + 1= 3.\n\
         Proof.\n\
         reflexivity.\n\
         Qed.\n"
    }

    /// An open proof with no tactics yet.
    pub const fn change_empty() -> &'static str {
        "Lemma change_empty : forall n:nat, 0 + n = n.\n\
         Proof.\n"
    }

    /// A file that already fails to check.
    pub const fn invalid_file() -> &'static str {
        "Goal True.\n\
         invalid_tactic.\n\
         Qed.\n"
    }

    /// A file with no proofs, for adding open proofs to.
    pub const fn add_open_proof() -> &'static str {
        "Definition zero : nat := 0.\n"
    }

    /// Modules and imports exercising qualified lookups.
    pub const fn imports() -> &'static str {
        "Module Out.\n\
         Module In.\n\
         Theorem plus_O_n : forall n:nat, 0 + n = n.\n\
         Proof.\n\
         trivial.\n\
         Qed.\n\
         End In.\n\
         End Out.\n\
         Import Out.\n\
         Goal True.\n\
         trivial.\n\
         Qed.\n"
    }
}

/// Write a fixture to a unique temp file and return its path.
pub fn write_fixture(name: &str, content: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "coq_proof_file_{name}_{}_{n}.v",
        std::process::id()
    ));
    std::fs::write(&path, content).expect("fixture write");
    path
}
