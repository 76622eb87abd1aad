// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn comments_blanks_and_quotes() {
    let raw = "# hdr\nA=1\n\nB=\"two\"\nC='three'\n# trailing";
    assert_eq!(normalize_env_vars(raw), "A=1\nB=two\nC=three");
}

#[test]
fn lines_without_equals_are_dropped() {
    assert_eq!(normalize_env_vars("JUSTAWORD\nA=1"), "A=1");
}

#[test]
fn key_and_value_are_trimmed() {
    assert_eq!(normalize_env_vars("  SPACED  =  padded value  "), "SPACED=padded value");
}

#[test]
fn value_may_contain_equals() {
    assert_eq!(
        normalize_env_vars("URL=postgres://u:p@h/db?sslmode=disable"),
        "URL=postgres://u:p@h/db?sslmode=disable"
    );
}

#[test]
fn only_matched_quotes_are_stripped() {
    assert_eq!(normalize_env_vars("A=\"open"), "A=\"open");
    assert_eq!(normalize_env_vars("B='mismatch\""), "B='mismatch\"");
    assert_eq!(normalize_env_vars("C=\"'nested'\""), "C=nested");
}

#[test]
fn comments_only_input_is_empty() {
    assert_eq!(normalize_env_vars("# a\n\n   \n# b"), "");
    assert_eq!(normalize_env_vars(""), "");
}

proptest! {
    #[test]
    fn normalization_is_idempotent(s in ".{0,200}") {
        let once = normalize_env_vars(&s);
        prop_assert_eq!(normalize_env_vars(&once), once.clone());
    }
}
