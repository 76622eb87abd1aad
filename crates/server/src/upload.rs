// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uploaded env-file handling.
//!
//! Multipart env files are spooled to a process-local temp directory
//! and referenced from the job envelope by path; the worker deletes
//! the file once the job is terminal.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Default spool directory.
pub fn env_file_dir() -> PathBuf {
    std::env::temp_dir().join("deployknot-env-files")
}

/// Save uploaded bytes under `dir` as `{uuid}_{name}`, creating the
/// directory if needed. The client-supplied name is flattened to a
/// bare file name first.
pub async fn save_env_file(
    dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let name = sanitize_file_name(original_name);
    let path = dir.join(format!("{}_{name}", Uuid::new_v4()));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Strip directory components and anything outside a conservative
/// charset so a hostile file name cannot escape the spool dir.
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim_matches('.');
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "env".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
