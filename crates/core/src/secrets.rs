// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret redaction for persisted logs and error messages.

/// Masks a fixed set of secret values in free-form text.
///
/// The worker builds one redactor per job from the job's SSH password
/// and GitHub PAT, and routes every log message and error string
/// through it before anything is persisted or streamed. Remote command
/// output is included: a failed `git clone` echoes the clone URL, PAT
/// and all.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    needles: Vec<String>,
}

const MASK: &str = "***";

impl Redactor {
    /// Build a redactor from secret values. Empty and very short
    /// values are skipped: masking one- or two-character fragments
    /// would mangle ordinary output without hiding anything.
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let needles = secrets
            .into_iter()
            .map(Into::into)
            .filter(|s| s.len() >= 3)
            .collect();
        Self { needles }
    }

    /// Replace every occurrence of every secret with `***`.
    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for needle in &self.needles {
            if out.contains(needle.as_str()) {
                out = out.replace(needle.as_str(), MASK);
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
