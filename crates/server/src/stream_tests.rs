// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use dk_core::{DeploymentId, DeploymentLog, LogLevel};

fn log(deployment_id: DeploymentId, message: &str) -> DeploymentLog {
    DeploymentLog::new(
        deployment_id,
        LogLevel::Info,
        message,
        "git_clone",
        Some(1),
        Utc::now(),
    )
}

#[test]
fn admit_orders_by_created_at_then_id() {
    let id = DeploymentId::new();
    let a = log(id, "first");
    let b = log(id, "second");
    let c = log(id, "third");

    let mut cursor = LogCursor::new();
    let out = cursor.admit(vec![c.clone(), a.clone(), b.clone()]);
    let messages: Vec<&str> = out.iter().map(|l| l.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
    assert_eq!(cursor.last(), Some(c.id));
}

#[test]
fn admit_never_re_emits() {
    let id = DeploymentId::new();
    let a = log(id, "a");
    let b = log(id, "b");

    let mut cursor = LogCursor::new();
    assert_eq!(cursor.admit(vec![a.clone(), b.clone()]).len(), 2);
    // A retried poll returning the same rows yields nothing.
    assert!(cursor.admit(vec![a.clone(), b.clone()]).is_empty());

    // New rows after the cursor still flow.
    let c = log(id, "c");
    let out = cursor.admit(vec![b, c.clone()]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, c.id);
}

#[test]
fn late_attach_catch_up_then_increments_do_not_reorder() {
    // Observer attaches after "step 2" logs exist, then "step 3" logs
    // arrive: the catch-up batch and subsequent polls must splice into
    // one ordered sequence with no overlap.
    let id = DeploymentId::new();
    let step2: Vec<DeploymentLog> = (0..5).map(|i| log(id, &format!("s2-{i}"))).collect();
    let step3: Vec<DeploymentLog> = (0..5).map(|i| log(id, &format!("s3-{i}"))).collect();

    let mut cursor = LogCursor::new();
    let mut seen: Vec<DeploymentLog> = cursor.admit(step2.clone());
    seen.extend(cursor.admit(step3.clone()));

    let messages: Vec<&str> = seen.iter().map(|l| l.message.as_str()).collect();
    let expected: Vec<String> = (0..5)
        .map(|i| format!("s2-{i}"))
        .chain((0..5).map(|i| format!("s3-{i}")))
        .collect();
    assert_eq!(messages, expected.iter().map(String::as_str).collect::<Vec<_>>());

    let mut ordered = seen.clone();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    assert_eq!(
        seen.iter().map(|l| l.id).collect::<Vec<_>>(),
        ordered.iter().map(|l| l.id).collect::<Vec<_>>()
    );
}

#[test]
fn empty_batches_leave_the_cursor_alone() {
    let mut cursor = LogCursor::new();
    assert!(cursor.admit(Vec::new()).is_empty());
    assert_eq!(cursor.last(), None);
}
