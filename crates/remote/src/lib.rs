// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH/SFTP remote executor.
//!
//! A thin wrapper around `ssh2`. One [`SshHost`] is opened per
//! deployment and dropped when the step pipeline finishes; every
//! `run` opens a fresh channel (session in SSH terms) for its one
//! command and closes it before returning; channels are never reused
//! across commands.
//!
//! `ssh2` is a blocking libssh2 binding, so every operation runs on the
//! tokio blocking pool. Commands within one deployment are strictly
//! sequential, which the internal mutex enforces as a side effect.

mod host;

pub use host::{RemoteHost, SshHost};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// TCP dial, handshake, or authentication failure.
    #[error("failed to connect to {host}: {message}")]
    Connect { host: String, message: String },

    /// The command ran and exited non-zero. Carries the combined
    /// stdout/stderr so callers can persist it.
    #[error("command exited with status {status}: {output}")]
    CommandFailed { status: i32, output: String },

    /// Transport failure while running a command.
    #[error("remote command error: {0}")]
    Command(String),

    /// SFTP transfer failure.
    #[error("file transfer failed: {0}")]
    FileTransfer(String),
}

impl RemoteError {
    /// Combined output of the failed command, when there is any.
    pub fn output(&self) -> Option<&str> {
        match self {
            RemoteError::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}
