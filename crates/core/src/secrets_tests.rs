// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn masks_every_occurrence() {
    let r = Redactor::new(["ghp_token123", "hunter2"]);
    let out = r.redact("clone https://ghp_token123@github.com failed; pw=hunter2 ghp_token123");
    assert_eq!(out, "clone https://***@github.com failed; pw=*** ***");
}

#[test]
fn short_secrets_are_not_masked() {
    let r = Redactor::new(["ab", ""]);
    assert_eq!(r.redact("ab abc"), "ab abc");
}

#[test]
fn text_without_secrets_is_untouched() {
    let r = Redactor::new(["ghp_token123"]);
    assert_eq!(r.redact("all good"), "all good");
}
