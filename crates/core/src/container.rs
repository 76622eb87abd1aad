// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container name generation.

use crate::id::DeploymentId;

/// Longest sanitized segment we will emit.
const MAX_SEGMENT_LEN: usize = 50;

/// Docker's own container-name constraint. Caller-supplied names are
/// validated against this before being interpolated into any command.
pub fn is_valid_container_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Resolve the canonical container name for a deployment.
///
/// Precedence: a caller-supplied name wins verbatim; otherwise, when
/// both project and deployment display names are set, the name is
/// `deployknot-{project}-{deployment}` with both segments sanitized;
/// otherwise `deployknot-{id}`.
pub fn canonical_container_name(
    id: DeploymentId,
    container_name: Option<&str>,
    project_name: Option<&str>,
    deployment_name: Option<&str>,
) -> String {
    if let Some(name) = container_name {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    match (project_name, deployment_name) {
        (Some(project), Some(deployment)) if !project.is_empty() && !deployment.is_empty() => {
            format!("deployknot-{}-{}", sanitize(project), sanitize(deployment))
        }
        _ => format!("deployknot-{id}"),
    }
}

/// Sanitize a display name into a Docker-safe segment: lowercase,
/// everything outside `[a-z0-9-]` becomes `-`, runs of `-` collapse to
/// one, leading/trailing `-` are trimmed, empty falls back to `app`,
/// and the result is capped at 50 characters. Idempotent.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars().flat_map(|c| c.to_lowercase()) {
        let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if mapped == '-' && out.ends_with('-') {
            continue;
        }
        out.push(mapped);
    }
    let mut out: String = out.trim_matches('-').to_string();
    if out.len() > MAX_SEGMENT_LEN {
        out.truncate(MAX_SEGMENT_LEN);
        while out.ends_with('-') {
            out.pop();
        }
    }
    if out.is_empty() {
        out.push_str("app");
    }
    out
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
