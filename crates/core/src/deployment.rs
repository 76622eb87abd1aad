// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment, step, and log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::id::{DeploymentId, LogId, StepId, UserId};
use crate::status::{DeploymentStatus, LogLevel, StepStatus};
use crate::step::StepName;

/// A single automated rollout, as persisted by the store.
///
/// Carries the SSH password and GitHub PAT needed by the worker, so the
/// struct deliberately does not implement `Serialize`; read APIs go
/// through [`DeploymentView`], which omits the secrets. `Debug` redacts
/// them for the same reason.
#[derive(Clone)]
pub struct Deployment {
    pub id: DeploymentId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: DeploymentStatus,
    pub target_ip: String,
    pub ssh_username: String,
    pub ssh_password: String,
    pub github_repo_url: String,
    pub github_pat: String,
    pub github_branch: String,
    pub additional_vars: Option<BTreeMap<String, String>>,
    pub port: u16,
    pub container_name: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_by: Option<String>,
    pub project_name: Option<String>,
    pub deployment_name: Option<String>,
    pub user_id: Option<UserId>,
}

impl fmt::Debug for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deployment")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("target_ip", &self.target_ip)
            .field("ssh_username", &self.ssh_username)
            .field("ssh_password", &"<redacted>")
            .field("github_repo_url", &self.github_repo_url)
            .field("github_pat", &"<redacted>")
            .field("github_branch", &self.github_branch)
            .field("port", &self.port)
            .field("container_name", &self.container_name)
            .finish_non_exhaustive()
    }
}

/// The secret-free projection of a deployment returned by every read
/// API and by the create endpoint as the deployment handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentView {
    pub id: DeploymentId,
    pub status: DeploymentStatus,
    pub target_ip: String,
    pub github_repo_url: String,
    pub github_branch: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
}

impl From<&Deployment> for DeploymentView {
    fn from(d: &Deployment) -> Self {
        Self {
            id: d.id,
            status: d.status,
            target_ip: d.target_ip.clone(),
            github_repo_url: d.github_repo_url.clone(),
            github_branch: d.github_branch.clone(),
            port: d.port,
            container_name: d.container_name.clone(),
            created_at: d.created_at,
            started_at: d.started_at,
            completed_at: d.completed_at,
            error_message: d.error_message.clone(),
            project_name: d.project_name.clone(),
            deployment_name: d.deployment_name.clone(),
        }
    }
}

/// One stage of the deployment pipeline with its own status and timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentStep {
    pub id: StepId,
    pub deployment_id: DeploymentId,
    pub step_name: StepName,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub step_order: i32,
}

impl DeploymentStep {
    /// A fresh pending step row, as written at deployment creation.
    pub fn pending(deployment_id: DeploymentId, step_name: StepName, step_order: i32) -> Self {
        Self {
            id: StepId::new(),
            deployment_id,
            step_name,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            error_message: None,
            step_order,
        }
    }

    /// Transition to `running`, stamping `started_at`.
    pub fn begin(&mut self, at: DateTime<Utc>) {
        self.status = StepStatus::Running;
        self.started_at = Some(at);
    }

    /// Transition to `completed`, stamping `completed_at` and deriving
    /// `duration_ms` from `started_at`.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = StepStatus::Completed;
        self.finish(at);
    }

    /// Transition to `failed` with the captured reason.
    pub fn fail(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        self.status = StepStatus::Failed;
        self.error_message = Some(reason.into());
        self.finish(at);
    }

    fn finish(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at);
        if let Some(started) = self.started_at {
            self.duration_ms = Some((at - started).num_milliseconds());
        }
    }
}

/// One appended log entry. Append-only: rows are never mutated, and
/// ordering within a deployment is `(created_at, id)` ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentLog {
    pub id: LogId,
    pub deployment_id: DeploymentId,
    pub created_at: DateTime<Utc>,
    pub log_level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_order: Option<i32>,
}

impl DeploymentLog {
    pub fn new(
        deployment_id: DeploymentId,
        level: LogLevel,
        message: impl Into<String>,
        task_name: impl Into<String>,
        step_order: Option<i32>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LogId::new(),
            deployment_id,
            created_at: at,
            log_level: level,
            message: message.into(),
            task_name: Some(task_name.into()),
            step_order,
        }
    }
}

#[cfg(test)]
#[path = "deployment_tests.rs"]
mod tests;
