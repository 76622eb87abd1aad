// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step bodies for the deployment pipeline.
//!
//! Each body performs its remote substeps and returns `Ok` or a
//! [`StepFailure`] carrying the message to persist; the generic
//! mark/log/abandon bookkeeping lives in the runner.

use dk_core::{command, normalize_env_vars, Clock, LogLevel};

use crate::ports::{Connector, DeploymentStore, JobQueue};
use crate::runner::{Execution, StepFailure};

impl<'a, S, Q, C, K> Execution<'a, S, Q, C, K>
where
    S: DeploymentStore,
    Q: JobQueue,
    C: Connector,
    K: Clock,
{
    /// Step 1: clean the working copy and clone the repository,
    /// checking out a non-`main` branch when requested.
    pub(crate) async fn git_clone(&self, order: i32) -> Result<(), StepFailure> {
        self.run_warn_only(
            &command::cleanup_workdir_command(),
            "git_cleanup",
            order,
            "Existing directory cleaned up",
            "Cleanup warning",
        )
        .await;

        let data = &self.job.data;
        let clone = command::clone_command(
            &data.github_pat,
            &data.github_repo_url,
            &data.github_branch,
        );
        let output = self
            .run_remote(&clone, self.runner.settings.command_timeout)
            .await
            .map_err(|e| StepFailure(format!("Git clone failed: {e}")))?;

        self.log(
            LogLevel::Info,
            &format!("Repository cloned successfully: {output}"),
            "git_clone",
            Some(order),
        )
        .await;
        Ok(())
    }

    /// Step 2: clear stale container/image state, then build the image
    /// from the working copy.
    pub(crate) async fn docker_build(&self, order: i32) -> Result<(), StepFailure> {
        let name = &self.job.data.container_name;

        self.run_warn_only(
            &command::remove_container_command(name),
            "docker_rm",
            order,
            "Existing container removed successfully",
            "Remove existing container warning",
        )
        .await;
        self.run_warn_only(
            &command::remove_image_command(name),
            "docker_rmi",
            order,
            "Existing image removed successfully",
            "Remove existing image warning",
        )
        .await;
        self.run_warn_only(
            command::prune_command(),
            "docker_prune",
            order,
            "Docker system cleaned successfully",
            "Docker prune warning",
        )
        .await;
        self.pause_for_cleanup().await;

        let output = self
            .run_remote(&command::build_command(name), self.runner.settings.build_timeout)
            .await
            .map_err(|e| StepFailure(format!("Docker build failed: {e}")))?;

        self.log(
            LogLevel::Info,
            &format!("Docker image built successfully: {output}"),
            "docker_build",
            Some(order),
        )
        .await;
        Ok(())
    }

    /// Step 3: stop leftovers, verify Docker, materialize the
    /// container environment, and start the container.
    pub(crate) async fn docker_run(&self, order: i32) -> Result<(), StepFailure> {
        let data = &self.job.data;
        let name = &data.container_name;

        self.run_warn_only(
            &command::stop_container_command(name),
            "docker_stop",
            order,
            "Existing container cleanup completed",
            "Stop existing container warning",
        )
        .await;
        self.pause_for_cleanup().await;

        let version = self
            .run_remote(command::docker_version_command(), self.runner.settings.command_timeout)
            .await
            .map_err(|e| StepFailure(format!("Docker not available: {e}")))?;
        self.log(
            LogLevel::Info,
            &format!("Docker available: {}", version.trim()),
            "docker_check",
            Some(order),
        )
        .await;

        let env_file = self.materialize_env(order).await?;

        let run = command::run_command(name, data.port, env_file.as_deref());
        self.log(
            LogLevel::Info,
            &format!("Executing Docker run command: {run}"),
            "docker_run",
            Some(order),
        )
        .await;
        let output = self
            .run_remote(&run, self.runner.settings.command_timeout)
            .await
            .map_err(|e| StepFailure(format!("Docker run failed: {e}")))?;

        self.log(
            LogLevel::Info,
            &format!("Docker container started successfully with ID: {}", output.trim()),
            "docker_run",
            Some(order),
        )
        .await;
        Ok(())
    }

    /// Produce the `--env-file` argument for `docker run`, if any.
    ///
    /// Uploaded file wins over inline variables; inline variables that
    /// normalize to nothing behave like no env file at all.
    async fn materialize_env(&self, order: i32) -> Result<Option<String>, StepFailure> {
        let data = &self.job.data;

        if let Some(local_path) = &data.env_file_path {
            self.log(
                LogLevel::Info,
                "Copying uploaded .env file to target instance",
                "env_upload",
                Some(order),
            )
            .await;
            let host = self
                .host
                .as_ref()
                .ok_or_else(|| StepFailure("remote host not connected".to_string()))?;
            host.upload(local_path, command::REMOTE_UPLOADED_ENV)
                .await
                .map_err(|e| StepFailure(format!("Failed to upload env file: {e}")))?;
            self.log(
                LogLevel::Info,
                "Uploaded .env file to target instance",
                "env_upload",
                Some(order),
            )
            .await;

            let verify = self
                .run_remote(
                    &command::verify_env_file_command(command::REMOTE_UPLOADED_ENV),
                    self.runner.settings.command_timeout,
                )
                .await
                .map_err(|e| StepFailure(format!("Env file check failed: {e}")))?;
            self.log(
                LogLevel::Info,
                &format!("Env file verified: {verify}"),
                "env_check",
                Some(order),
            )
            .await;

            let name = &data.container_name;
            let image = self
                .run_remote(
                    &command::image_exists_command(name),
                    self.runner.settings.command_timeout,
                )
                .await
                .map_err(|e| StepFailure(format!("Image check failed: {e}")))?;
            if image.trim().is_empty() {
                return Err(StepFailure(format!("Docker image not found: {name}:latest")));
            }
            self.log(
                LogLevel::Info,
                &format!("Docker image found: {}", image.trim()),
                "image_check",
                Some(order),
            )
            .await;

            self.run_remote(&command::copy_env_command(), self.runner.settings.command_timeout)
                .await
                .map_err(|e| StepFailure(format!("Failed to copy env file: {e}")))?;
            self.log(LogLevel::Info, "Env file copied successfully", "env_copy", Some(order))
                .await;

            return Ok(Some(command::CONTAINER_ENV_FILE.to_string()));
        }

        if let Some(raw) = data.environment_vars.as_deref() {
            let normalized = normalize_env_vars(raw);
            if normalized.is_empty() {
                // Comments-only or blank input: run without --env-file.
                return Ok(None);
            }
            self.log(
                LogLevel::Info,
                "Creating .env file with environment variables",
                "env_setup",
                Some(order),
            )
            .await;
            let path = command::remote_inline_env_path(self.job.deployment_id);
            self.run_remote(
                &command::write_env_file_command(&path, &normalized),
                self.runner.settings.command_timeout,
            )
            .await
            .map_err(|e| StepFailure(format!("Failed to create .env file: {e}")))?;

            self.run_warn_only(
                &command::verify_env_file_command(&path),
                "env_verify",
                order,
                "Environment file created and verified",
                "Env file verification warning",
            )
            .await;
            self.log(
                LogLevel::Info,
                "Environment variables file created successfully",
                "env_setup",
                Some(order),
            )
            .await;
            return Ok(Some(path));
        }

        Ok(None)
    }

    /// Step 4: the container must be listed by `docker ps` with an
    /// `Up` status. A zero exit with empty output (container missing
    /// or already dead) is a failure.
    pub(crate) async fn health_check(&self, order: i32) -> Result<(), StepFailure> {
        let name = &self.job.data.container_name;
        let output = self
            .run_remote(
                &command::health_check_command(name),
                self.runner.settings.command_timeout,
            )
            .await
            .map_err(|e| StepFailure(format!("Health check failed: {e}")))?;

        let running = output
            .lines()
            .any(|line| line.contains(name.as_str()) && line.contains("Up"));
        if !running {
            return Err(StepFailure(format!(
                "Health check failed: container {name} is not running, output: {}",
                output.trim()
            )));
        }

        self.log(
            LogLevel::Info,
            &format!("Health check passed: {output}"),
            "health_check",
            Some(order),
        )
        .await;
        Ok(())
    }
}
