// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH host connection and command execution.

use async_trait::async_trait;
use ssh2::Session;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::RemoteError;

/// Dial timeout, and the ceiling for any single blocking libssh2 call.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One remote shell endpoint. The production implementation is
/// [`SshHost`]; the engine's tests substitute fakes.
#[async_trait]
pub trait RemoteHost: Send + Sync {
    /// Run one command in a fresh session and return its combined
    /// stdout/stderr. Non-zero exit is an error carrying the output.
    async fn run(&self, command: &str) -> Result<String, RemoteError>;

    /// Upload a local file via SFTP, creating or truncating the remote
    /// path.
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError>;
}

/// A password-authenticated SSH connection to a target host.
///
/// Host keys are accepted without verification (tolerant mode,
/// trust-on-first-use); `ssh2` performs no known-hosts checking unless
/// asked to, which matches that contract.
pub struct SshHost {
    session: Arc<Mutex<Session>>,
    host: String,
}

impl SshHost {
    /// Dial `host:22` and authenticate with a password. 30 s timeout
    /// on the dial and on each subsequent blocking operation.
    pub async fn connect(host: &str, username: &str, password: &str) -> Result<Self, RemoteError> {
        let host = host.to_string();
        let username = username.to_string();
        let password = password.to_string();

        let connect_host = host.clone();
        let session = tokio::task::spawn_blocking(move || {
            dial(&connect_host, &username, &password)
        })
        .await
        .map_err(|e| RemoteError::Connect {
            host: host.clone(),
            message: format!("connect task failed: {e}"),
        })??;

        tracing::info!(host = %host, "ssh connection established");
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            host,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

fn dial(host: &str, username: &str, password: &str) -> Result<Session, RemoteError> {
    let connect_err = |message: String| RemoteError::Connect {
        host: host.to_string(),
        message,
    };

    let addr = (host, 22)
        .to_socket_addrs()
        .map_err(|e| connect_err(format!("address resolution failed: {e}")))?
        .next()
        .ok_or_else(|| connect_err("address resolution returned nothing".to_string()))?;

    let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
        .map_err(|e| connect_err(format!("tcp dial failed: {e}")))?;

    let mut session = Session::new().map_err(|e| connect_err(format!("session init: {e}")))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(CONNECT_TIMEOUT.as_millis() as u32);
    session
        .handshake()
        .map_err(|e| connect_err(format!("handshake failed: {e}")))?;
    session
        .userauth_password(username, password)
        .map_err(|e| connect_err(format!("authentication failed: {e}")))?;
    if !session.authenticated() {
        return Err(connect_err("authentication rejected".to_string()));
    }
    Ok(session)
}

#[async_trait]
impl RemoteHost for SshHost {
    async fn run(&self, command: &str) -> Result<String, RemoteError> {
        let session = Arc::clone(&self.session);
        let command = command.to_string();

        tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| RemoteError::Command("session mutex poisoned".to_string()))?;

            let mut channel = session
                .channel_session()
                .map_err(|e| RemoteError::Command(format!("channel open failed: {e}")))?;
            channel
                .exec(&command)
                .map_err(|e| RemoteError::Command(format!("exec failed: {e}")))?;

            // Combined output: stdout first, then stderr. libssh2
            // buffers both, so nothing is lost by reading serially.
            let mut output = String::new();
            channel
                .read_to_string(&mut output)
                .map_err(|e| RemoteError::Command(format!("read stdout failed: {e}")))?;
            let mut stderr = String::new();
            channel
                .stderr()
                .read_to_string(&mut stderr)
                .map_err(|e| RemoteError::Command(format!("read stderr failed: {e}")))?;
            output.push_str(&stderr);

            channel
                .wait_close()
                .map_err(|e| RemoteError::Command(format!("close failed: {e}")))?;
            let status = channel
                .exit_status()
                .map_err(|e| RemoteError::Command(format!("exit status unavailable: {e}")))?;

            if status != 0 {
                return Err(RemoteError::CommandFailed { status, output });
            }
            Ok(output)
        })
        .await
        .map_err(|e| RemoteError::Command(format!("command task failed: {e}")))?
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let session = Arc::clone(&self.session);
        let local: PathBuf = local.to_path_buf();
        let remote = remote.to_string();

        tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| RemoteError::FileTransfer("session mutex poisoned".to_string()))?;

            let mut file = std::fs::File::open(&local).map_err(|e| {
                RemoteError::FileTransfer(format!("open {} failed: {e}", local.display()))
            })?;
            let sftp = session
                .sftp()
                .map_err(|e| RemoteError::FileTransfer(format!("sftp init failed: {e}")))?;
            let mut target = sftp
                .create(Path::new(&remote))
                .map_err(|e| RemoteError::FileTransfer(format!("create {remote} failed: {e}")))?;
            std::io::copy(&mut file, &mut target)
                .map_err(|e| RemoteError::FileTransfer(format!("copy to {remote} failed: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| RemoteError::FileTransfer(format!("upload task failed: {e}")))?
    }
}
