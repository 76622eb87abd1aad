// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The step runner state machine.
//!
//! One [`StepRunner::process`] call drives one deployment job from
//! `running` to a terminal state. The pipeline is fixed: connect, then
//! `git_clone` → `docker_build` → `docker_run` → `health_check`. Every
//! step follows the same shape (mark running, log, execute, mark
//! completed or failed), and a failure abandons every later step.
//!
//! The runner is the recovery boundary: nothing escapes to the worker
//! loop except the error summary it reports on the job record. Step
//! row updates and log appends after the initial status transition are
//! best-effort; a store hiccup is logged rather than tearing down an
//! in-flight remote pipeline.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use dk_core::{
    Clock, DeploymentLog, DeploymentStatus, DeploymentStep, Job, JobStatus, LogLevel, Redactor,
    StepName, StepStatus,
};
use dk_queue::QueueError;
use dk_remote::{RemoteError, RemoteHost};
use dk_storage::StoreError;

use crate::ports::{Connector, DeploymentStore, JobQueue};

/// Reason recorded on steps skipped because of an upstream failure.
pub(crate) fn abandoned_reason(failed_order: i32) -> String {
    format!("Step abandoned due to failure in step {failed_order}")
}

/// Reason recorded on steps and deployments when cancellation wins.
pub(crate) const CANCELLED_REASON: &str = "cancelled";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("missing required deployment parameters")]
    MissingParameters,

    #[error("Failed to connect to target server {host}: {message}")]
    Connect { host: String, message: String },

    #[error("step {step} failed: {message}")]
    Step { step: StepName, message: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Execution deadlines and pauses. Defaults match production; tests
/// zero the pause.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Ceiling for `docker build`.
    pub build_timeout: Duration,
    /// Ceiling for every other remote command.
    pub command_timeout: Duration,
    /// Settle time between container cleanup and the next Docker
    /// operation.
    pub cleanup_pause: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            build_timeout: Duration::from_secs(600),
            command_timeout: Duration::from_secs(120),
            cleanup_pause: Duration::from_secs(2),
        }
    }
}

/// Drives deployments through the pipeline. One instance serves a
/// worker for its lifetime.
pub struct StepRunner<S, Q, C, K> {
    pub(crate) store: S,
    pub(crate) queue: Q,
    pub(crate) connector: C,
    pub(crate) clock: K,
    pub(crate) settings: RunnerSettings,
}

impl<S, Q, C, K> StepRunner<S, Q, C, K>
where
    S: DeploymentStore,
    Q: JobQueue,
    C: Connector,
    K: Clock,
{
    pub fn new(store: S, queue: Q, connector: C, clock: K) -> Self {
        Self {
            store,
            queue,
            connector,
            clock,
            settings: RunnerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RunnerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Process one deployment job to a terminal state.
    pub async fn process(&self, job: &Job) -> Result<(), RunnerError> {
        let redactor = Redactor::new([
            job.data.ssh_password.as_str(),
            job.data.github_pat.as_str(),
        ]);
        let mut exec = Execution {
            runner: self,
            job,
            redactor,
            steps: Vec::new(),
            host: None,
        };
        exec.run().await
    }
}

/// State for one in-flight deployment.
pub(crate) struct Execution<'a, S, Q, C, K> {
    pub(crate) runner: &'a StepRunner<S, Q, C, K>,
    pub(crate) job: &'a Job,
    pub(crate) redactor: Redactor,
    pub(crate) steps: Vec<DeploymentStep>,
    pub(crate) host: Option<Arc<dyn RemoteHost>>,
}

/// A step body's failure: the message that lands on the step row and
/// in the error log.
pub(crate) struct StepFailure(pub String);

impl<'a, S, Q, C, K> Execution<'a, S, Q, C, K>
where
    S: DeploymentStore,
    Q: JobQueue,
    C: Connector,
    K: Clock,
{
    async fn run(&mut self) -> Result<(), RunnerError> {
        let id = self.job.deployment_id;
        tracing::info!(
            job_id = %self.job.id,
            deployment_id = %id,
            target_ip = %self.job.data.target_ip,
            container_name = %self.job.data.container_name,
            "processing deployment job"
        );

        self.runner
            .store
            .update_deployment_status(id, DeploymentStatus::Running, None)
            .await?;
        self.log(LogLevel::Info, "Starting deployment process", "deployment_start", None)
            .await;

        self.steps = self.runner.store.list_steps(id).await?;

        if let Err(missing) = self.validate_params() {
            let message = "missing required deployment parameters";
            tracing::error!(deployment_id = %id, field = missing, "job data incomplete");
            self.fail_all_steps(message).await;
            self.fail_deployment(message).await;
            return Err(RunnerError::MissingParameters);
        }

        if self.cancel_requested().await {
            self.abort().await;
            return Ok(());
        }

        let data = &self.job.data;
        match self
            .runner
            .connector
            .connect(&data.target_ip, &data.ssh_username, &data.ssh_password)
            .await
        {
            Ok(host) => self.host = Some(host),
            Err(e) => {
                let message = self.redactor.redact(&format!(
                    "Failed to connect to target server {}: {e}",
                    data.target_ip
                ));
                self.log(LogLevel::Error, &message, "ssh_connect", None).await;
                self.fail_all_steps(&message).await;
                self.fail_deployment(&message).await;
                return Err(RunnerError::Connect {
                    host: data.target_ip.clone(),
                    message,
                });
            }
        }
        self.log(LogLevel::Info, "SSH connection established", "ssh_connect", None)
            .await;

        for order in 1..=StepName::PIPELINE.len() as i32 {
            if self.cancel_requested().await {
                self.abort().await;
                return Ok(());
            }
            self.run_step(order).await?;
        }

        self.finalize().await;
        Ok(())
    }

    fn validate_params(&self) -> Result<(), &'static str> {
        let d = &self.job.data;
        for (value, name) in [
            (&d.target_ip, "target_ip"),
            (&d.ssh_username, "ssh_username"),
            (&d.ssh_password, "ssh_password"),
            (&d.github_repo_url, "github_repo_url"),
            (&d.github_pat, "github_pat"),
            (&d.github_branch, "github_branch"),
            (&d.container_name, "container_name"),
        ] {
            if value.is_empty() {
                return Err(name);
            }
        }
        Ok(())
    }

    /// Run one pipeline step with the common mark/log/execute/finish
    /// shape. A failure performs all abandonment bookkeeping before
    /// returning.
    async fn run_step(&mut self, order: i32) -> Result<(), RunnerError> {
        let now = self.runner.clock.now();
        let name = match self.step_name(order) {
            Some(name) => name,
            None => return Ok(()), // row missing; nothing to drive
        };

        self.with_step(order, |step| step.begin(now)).await;
        if order == 1 {
            // Deployment started_at = first step transition to running.
            if let Err(e) = self
                .runner
                .store
                .update_deployment_timing(self.job.deployment_id, Some(now), None)
                .await
            {
                tracing::error!(error = %e, "failed to stamp deployment start");
            }
        }

        let result = match name {
            StepName::GitClone => {
                self.log(LogLevel::Info, "Starting repository clone", "git_clone", Some(order))
                    .await;
                self.git_clone(order).await
            }
            StepName::DockerBuild => {
                self.log(LogLevel::Info, "Starting Docker build", "docker_build", Some(order))
                    .await;
                self.docker_build(order).await
            }
            StepName::DockerRun => {
                self.log(LogLevel::Info, "Starting Docker container", "docker_run", Some(order))
                    .await;
                self.docker_run(order).await
            }
            StepName::HealthCheck => {
                self.log(LogLevel::Info, "Starting health check", "health_check", Some(order))
                    .await;
                self.health_check(order).await
            }
            StepName::ValidateCredentials => Ok(()),
        };

        match result {
            Ok(()) => {
                let done = self.runner.clock.now();
                self.with_step(order, |step| step.complete(done)).await;
                Ok(())
            }
            Err(StepFailure(raw)) => {
                let message = self.redactor.redact(&raw);
                self.log(LogLevel::Error, &message, name.as_str(), Some(order)).await;
                let failed_at = self.runner.clock.now();
                self.with_step(order, |step| step.fail(message.clone(), failed_at)).await;
                self.abandon_after(order).await;
                self.fail_deployment(&message).await;
                Err(RunnerError::Step {
                    step: name,
                    message,
                })
            }
        }
    }

    /// Terminal success: deployment `completed`, job record updated.
    async fn finalize(&self) {
        let id = self.job.deployment_id;
        let now = self.runner.clock.now();
        if let Err(e) = self
            .runner
            .store
            .update_deployment_status(id, DeploymentStatus::Completed, None)
            .await
        {
            tracing::error!(error = %e, "failed to mark deployment completed");
        }
        if let Err(e) = self
            .runner
            .store
            .update_deployment_timing(id, None, Some(now))
            .await
        {
            tracing::error!(error = %e, "failed to stamp deployment completion");
        }
        self.log(
            LogLevel::Info,
            "Deployment completed successfully",
            "deployment_complete",
            None,
        )
        .await;
        if let Err(e) = self
            .runner
            .queue
            .update_job(self.job.id, JobStatus::Completed, None)
            .await
        {
            tracing::error!(error = %e, "failed to update job record");
        }
        tracing::info!(deployment_id = %id, "deployment completed");
    }

    /// Terminal failure: deployment `failed` with the proximate cause.
    async fn fail_deployment(&self, message: &str) {
        let id = self.job.deployment_id;
        let now = self.runner.clock.now();
        self.log(
            LogLevel::Error,
            &format!("Deployment failed: {message}"),
            "deployment_failed",
            None,
        )
        .await;
        if let Err(e) = self
            .runner
            .store
            .update_deployment_status(id, DeploymentStatus::Failed, Some(message))
            .await
        {
            tracing::error!(error = %e, "failed to mark deployment failed");
        }
        if let Err(e) = self
            .runner
            .store
            .update_deployment_timing(id, None, Some(now))
            .await
        {
            tracing::error!(error = %e, "failed to stamp deployment completion");
        }
        if let Err(e) = self
            .runner
            .queue
            .update_job(self.job.id, JobStatus::Failed, Some(message))
            .await
        {
            tracing::error!(error = %e, "failed to update job record");
        }
    }

    /// Cancellation observed at a step boundary: the deployment
    /// transitions to `aborted` and every non-terminal step is failed
    /// with the cancellation reason.
    async fn abort(&mut self) {
        let id = self.job.deployment_id;
        let now = self.runner.clock.now();
        tracing::info!(deployment_id = %id, "cancellation requested, aborting");
        self.log(
            LogLevel::Warn,
            "Deployment cancelled before completion",
            "cancelled",
            None,
        )
        .await;
        self.fail_all_steps(CANCELLED_REASON).await;
        if let Err(e) = self
            .runner
            .store
            .update_deployment_status(id, DeploymentStatus::Aborted, Some(CANCELLED_REASON))
            .await
        {
            tracing::error!(error = %e, "failed to mark deployment aborted");
        }
        if let Err(e) = self
            .runner
            .store
            .update_deployment_timing(id, None, Some(now))
            .await
        {
            tracing::error!(error = %e, "failed to stamp deployment completion");
        }
        if let Err(e) = self
            .runner
            .queue
            .update_job(self.job.id, JobStatus::Failed, Some(CANCELLED_REASON))
            .await
        {
            tracing::error!(error = %e, "failed to update job record");
        }
    }

    /// Mark every step after `failed_order` that has not finished as
    /// failed with the abandonment reason.
    async fn abandon_after(&mut self, failed_order: i32) {
        let reason = abandoned_reason(failed_order);
        let now = self.runner.clock.now();
        let orders: Vec<i32> = self
            .steps
            .iter()
            .filter(|s| {
                s.step_order > failed_order
                    && matches!(s.status, StepStatus::Pending | StepStatus::Running)
            })
            .map(|s| s.step_order)
            .collect();
        for order in orders {
            self.with_step(order, |step| step.fail(reason.clone(), now)).await;
        }
    }

    /// Mark every non-terminal step as failed (connect failures,
    /// cancellation, invalid job data).
    async fn fail_all_steps(&mut self, reason: &str) {
        let now = self.runner.clock.now();
        let orders: Vec<i32> = self
            .steps
            .iter()
            .filter(|s| !s.status.is_terminal())
            .map(|s| s.step_order)
            .collect();
        for order in orders {
            self.with_step(order, |step| step.fail(reason.to_string(), now)).await;
        }
    }

    async fn cancel_requested(&self) -> bool {
        match self
            .runner
            .queue
            .is_cancel_requested(self.job.deployment_id)
            .await
        {
            Ok(flag) => flag,
            Err(e) => {
                tracing::warn!(error = %e, "cancel flag check failed");
                false
            }
        }
    }

    fn step_name(&self, order: i32) -> Option<StepName> {
        self.steps
            .iter()
            .find(|s| s.step_order == order)
            .map(|s| s.step_name)
    }

    /// Mutate a cached step row and persist it. Persistence is
    /// best-effort; reruns of the same update are tolerated.
    async fn with_step<F>(&mut self, order: i32, mutate: F)
    where
        F: FnOnce(&mut DeploymentStep),
    {
        let Some(step) = self.steps.iter_mut().find(|s| s.step_order == order) else {
            return;
        };
        mutate(step);
        let snapshot = step.clone();
        if let Err(e) = self.runner.store.update_step(&snapshot).await {
            tracing::error!(
                deployment_id = %self.job.deployment_id,
                step_order = order,
                error = %e,
                "failed to persist step update"
            );
        }
    }

    /// Append a deployment log row, redacted. Best-effort.
    pub(crate) async fn log(
        &self,
        level: LogLevel,
        message: &str,
        task_name: &str,
        step_order: Option<i32>,
    ) {
        let message = self.redactor.redact(message);
        let row = DeploymentLog::new(
            self.job.deployment_id,
            level,
            message,
            task_name,
            step_order,
            self.runner.clock.now(),
        );
        if let Err(e) = self.runner.store.append_log(&row).await {
            tracing::error!(
                deployment_id = %self.job.deployment_id,
                error = %e,
                "failed to append deployment log"
            );
        }
    }

    /// Run a remote command under a deadline, mapping every failure
    /// mode to the message that should land on the step row.
    pub(crate) async fn run_remote(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, String> {
        let Some(host) = self.host.as_ref() else {
            return Err("remote host not connected".to_string());
        };
        match tokio::time::timeout(timeout, host.run(command)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(RemoteError::CommandFailed { status, output })) => {
                Err(format!("exit status {status}, output: {output}"))
            }
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "command timed out after {}s",
                timeout.as_secs()
            )),
        }
    }

    /// Run a best-effort command: success and failure both just log.
    pub(crate) async fn run_warn_only(
        &self,
        command: &str,
        task_name: &str,
        step_order: i32,
        ok_message: &str,
        warn_prefix: &str,
    ) {
        match self.run_remote(command, self.runner.settings.command_timeout).await {
            Ok(_) => {
                self.log(LogLevel::Info, ok_message, task_name, Some(step_order)).await;
            }
            Err(e) => {
                self.log(
                    LogLevel::Warn,
                    &format!("{warn_prefix}: {e}"),
                    task_name,
                    Some(step_order),
                )
                .await;
            }
        }
    }

    pub(crate) async fn pause_for_cleanup(&self) {
        let pause = self.runner.settings.cleanup_pause;
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
