// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment coordinator.
//!
//! Turns a validated creation request into durable state: one
//! deployment row, four pending step rows (written transactionally),
//! and one queued job envelope. Enqueue failure is deliberately not
//! fatal: the deployment stays `pending` and the failure is logged,
//! matching the store-first ordering the rest of the system assumes.

use thiserror::Error;

use dk_core::{
    canonical_container_name, container::is_valid_container_name, Clock, Deployment, DeploymentId,
    DeploymentStatus, DeploymentStep, DeploymentView, Job, JobData, StepName, UserId,
};
use dk_storage::StoreError;

use crate::ports::{DeploymentStore, JobQueue};

use std::collections::BTreeMap;
use std::path::PathBuf;

/// A deployment creation request, as assembled by the HTTP layer.
/// `port` stays a string here; converting it is the coordinator's
/// first validation step.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub target_ip: String,
    pub ssh_username: String,
    pub ssh_password: String,
    pub github_repo_url: String,
    pub github_pat: String,
    pub github_branch: String,
    pub port: String,
    pub container_name: Option<String>,
    pub project_name: Option<String>,
    pub deployment_name: Option<String>,
    pub additional_vars: Option<BTreeMap<String, String>>,
    pub environment_vars: Option<String>,
    pub env_file_path: Option<PathBuf>,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid port: {0:?} (expected an integer in 1..=65535)")]
    InvalidPort(String),

    #[error("invalid container name: {0:?}")]
    InvalidContainerName(String),

    #[error("failed to create deployment: {0}")]
    Store(#[from] StoreError),
}

impl CreateRequest {
    /// Field-level validation; the port range check happens during
    /// conversion.
    fn validate(&self) -> Result<(), CreateError> {
        for (value, name) in [
            (&self.target_ip, "target_ip"),
            (&self.ssh_username, "ssh_username"),
            (&self.ssh_password, "ssh_password"),
            (&self.github_repo_url, "github_repo_url"),
            (&self.github_pat, "github_pat"),
            (&self.github_branch, "github_branch"),
        ] {
            if value.trim().is_empty() {
                return Err(CreateError::MissingField(name));
            }
        }
        if let Some(name) = self.container_name.as_deref() {
            if !name.is_empty() && !is_valid_container_name(name) {
                return Err(CreateError::InvalidContainerName(name.to_string()));
            }
        }
        Ok(())
    }

    fn port(&self) -> Result<u16, CreateError> {
        match self.port.trim().parse::<u32>() {
            Ok(p) if (1..=65_535).contains(&p) => Ok(p as u16),
            _ => Err(CreateError::InvalidPort(self.port.clone())),
        }
    }
}

/// Creates deployments. Cheap to clone; shared between HTTP handlers.
#[derive(Clone)]
pub struct Coordinator<S, Q, C> {
    store: S,
    queue: Q,
    clock: C,
}

impl<S, Q, C> Coordinator<S, Q, C>
where
    S: DeploymentStore,
    Q: JobQueue,
    C: Clock,
{
    pub fn new(store: S, queue: Q, clock: C) -> Self {
        Self {
            store,
            queue,
            clock,
        }
    }

    /// Create a deployment and enqueue its job. Returns the
    /// secret-free handle echoed to the caller.
    pub async fn create(&self, request: CreateRequest) -> Result<DeploymentView, CreateError> {
        request.validate()?;
        let port = request.port()?;

        let id = DeploymentId::new();
        let now = self.clock.now();
        let container_name = canonical_container_name(
            id,
            request.container_name.as_deref(),
            request.project_name.as_deref(),
            request.deployment_name.as_deref(),
        );

        let deployment = Deployment {
            id,
            created_at: now,
            updated_at: now,
            status: DeploymentStatus::Pending,
            target_ip: request.target_ip.clone(),
            ssh_username: request.ssh_username.clone(),
            ssh_password: request.ssh_password.clone(),
            github_repo_url: request.github_repo_url.clone(),
            github_pat: request.github_pat.clone(),
            github_branch: request.github_branch.clone(),
            additional_vars: request.additional_vars.clone(),
            port,
            container_name: Some(container_name.clone()),
            started_at: None,
            completed_at: None,
            error_message: None,
            created_by: None,
            project_name: request.project_name.clone(),
            deployment_name: request.deployment_name.clone(),
            user_id: request.user_id,
        };

        let steps: Vec<DeploymentStep> = StepName::PIPELINE
            .iter()
            .enumerate()
            .map(|(i, name)| DeploymentStep::pending(id, *name, i as i32 + 1))
            .collect();

        self.store.create_deployment(&deployment, &steps).await?;

        let job = Job::deployment(
            id,
            JobData {
                target_ip: request.target_ip,
                ssh_username: request.ssh_username,
                ssh_password: request.ssh_password,
                github_repo_url: request.github_repo_url,
                github_pat: request.github_pat,
                github_branch: request.github_branch,
                port,
                container_name,
                project_name: request.project_name,
                deployment_name: request.deployment_name,
                additional_vars: request.additional_vars,
                env_file_path: request.env_file_path,
                environment_vars: request.environment_vars,
            },
            now,
        );

        if let Err(e) = self.queue.enqueue(&job).await {
            // The deployment row exists; leaving it pending keeps the
            // failure observable instead of silently rolling back.
            tracing::error!(deployment_id = %id, error = %e, "failed to enqueue deployment job");
        } else {
            tracing::info!(
                deployment_id = %id,
                job_id = %job.id,
                target_ip = %deployment.target_ip,
                branch = %deployment.github_branch,
                "deployment created and enqueued"
            );
        }

        Ok(DeploymentView::from(&deployment))
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
