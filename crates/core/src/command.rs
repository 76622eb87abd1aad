// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote command construction.
//!
//! Every shell string the worker sends over SSH is assembled here, so
//! the exact wire commands are testable without a connection. Free-form
//! values (branch names, URLs, file contents) are single-quote escaped;
//! container names are validated against Docker's own charset before
//! they ever reach this module, and ports are integers.

use crate::id::DeploymentId;

/// Remote working copy of the repository.
pub const REMOTE_WORKDIR: &str = "/tmp/deployknot-app";

/// Remote landing path for an uploaded env file.
pub const REMOTE_UPLOADED_ENV: &str = "/tmp/deployknot-uploaded.env";

/// Env-file path handed to `docker run` after the copy into the
/// worker's current directory.
pub const CONTAINER_ENV_FILE: &str = "./deployknot.env";

/// Remote path for an env file materialized from inline variables.
pub fn remote_inline_env_path(id: DeploymentId) -> String {
    format!("/tmp/deployknot-env-{id}.env")
}

/// POSIX single-quote escaping: the only character that needs special
/// treatment inside single quotes is the single quote itself.
pub fn sh_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// Reduce a repository URL to `owner/repo`: parse, drop the host, trim
/// the leading `/`, strip a `.git` suffix. Non-URL inputs are treated
/// as already being in `owner/repo` form.
pub fn normalize_repo_url(raw: &str) -> String {
    let path = match url::Url::parse(raw) {
        Ok(u) if u.host_str().is_some() => u.path().to_string(),
        _ => raw.to_string(),
    };
    path.trim_start_matches('/')
        .trim_end_matches(".git")
        .to_string()
}

/// `rm -rf` of the remote working copy before cloning. Warn-only.
pub fn cleanup_workdir_command() -> String {
    format!("rm -rf {REMOTE_WORKDIR}")
}

/// Clone with the PAT inline in the URL; the whole URL is quoted so
/// the PAT stays opaque to the shell. A non-`main` branch appends a
/// checkout in the working copy.
pub fn clone_command(pat: &str, repo_url: &str, branch: &str) -> String {
    let repo = normalize_repo_url(repo_url);
    let clone_url = format!("https://{pat}@github.com/{repo}.git");
    let mut cmd = format!("git clone {} {REMOTE_WORKDIR}", sh_quote(&clone_url));
    if branch != "main" {
        cmd.push_str(&format!(
            " && cd {REMOTE_WORKDIR} && git checkout {}",
            sh_quote(branch)
        ));
    }
    cmd
}

/// Force-remove a stale container. Idempotent (`|| true`).
pub fn remove_container_command(container_name: &str) -> String {
    format!("docker rm -f {container_name} 2>/dev/null || true")
}

/// Remove a stale image so the build starts fresh. Idempotent.
pub fn remove_image_command(container_name: &str) -> String {
    format!("docker rmi {container_name}:latest 2>/dev/null || true")
}

/// Prune dangling images and containers.
pub fn prune_command() -> &'static str {
    "docker system prune -f"
}

/// Build the image from the working copy, tagged with the container
/// name.
pub fn build_command(container_name: &str) -> String {
    format!("cd {REMOTE_WORKDIR} && docker build -t {container_name}:latest .")
}

/// Stop and remove the container plus any same-named leftovers that a
/// previous run may have stranded. Every leg is idempotent.
pub fn stop_container_command(container_name: &str) -> String {
    format!(
        "docker stop {container_name} 2>/dev/null || true && \
         docker rm {container_name} 2>/dev/null || true && \
         docker ps -a --filter name={container_name} --format '{{{{.Names}}}}' \
         | xargs -r docker rm -f 2>/dev/null || true"
    )
}

/// Sanity check that the Docker CLI exists on the target.
pub fn docker_version_command() -> &'static str {
    "docker --version"
}

/// Write normalized env content to a remote path via quoted here-doc
/// (no expansion inside the body).
pub fn write_env_file_command(path: &str, content: &str) -> String {
    format!("cat > {} << 'EOF'\n{content}\nEOF", sh_quote(path))
}

/// List the env file and echo its content for the deployment log.
pub fn verify_env_file_command(path: &str) -> String {
    let quoted = sh_quote(path);
    format!("ls -la {quoted} && echo '--- ENV FILE CONTENT ---' && cat {quoted}")
}

/// Check that the built image exists locally; empty output means it
/// does not.
pub fn image_exists_command(container_name: &str) -> String {
    format!("docker images {container_name}:latest --format '{{{{.Repository}}}}:{{{{.Tag}}}}'")
}

/// Copy the uploaded env file into the current directory where
/// `docker run` expects it.
pub fn copy_env_command() -> String {
    format!("cp {REMOTE_UPLOADED_ENV} {CONTAINER_ENV_FILE}")
}

/// Start the container detached, publishing the port symmetrically,
/// with an optional `--env-file`.
pub fn run_command(container_name: &str, port: u16, env_file: Option<&str>) -> String {
    match env_file {
        Some(path) => format!(
            "docker run -d --name {container_name} -p {port}:{port} --env-file {} {container_name}:latest",
            sh_quote(path)
        ),
        None => format!(
            "docker run -d --name {container_name} -p {port}:{port} {container_name}:latest"
        ),
    }
}

/// Show the running container's name and status. Zero exit is not
/// enough for the health step: the runner also requires the name and an
/// `Up` status in the output.
pub fn health_check_command(container_name: &str) -> String {
    format!(
        "docker ps --filter name={container_name} --format 'table {{{{.Names}}}}\t{{{{.Status}}}}'"
    )
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
