// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue job envelope.
//!
//! The envelope carries everything the worker needs to run a deployment
//! without touching the deployments table, including the SSH password
//! and GitHub PAT. It only ever travels through the queue service and
//! the per-job diagnostic record, never through a read API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::id::{DeploymentId, JobId};

/// Status of a job in the queue's per-job diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Kind discriminator, kept for forward compatibility of the wire
/// format even though deployments are the only job kind today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Deployment,
}

/// The request parameters the worker needs, mirroring the creation
/// request plus the resolved container name and, when an env file was
/// uploaded, the local path the server saved it under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobData {
    pub target_ip: String,
    pub ssh_username: String,
    pub ssh_password: String,
    pub github_repo_url: String,
    pub github_pat: String,
    pub github_branch: String,
    pub port: u16,
    pub container_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_vars: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_vars: Option<String>,
}

/// A queue envelope representing work to perform for a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub status: JobStatus,
    pub data: JobData,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub deployment_id: DeploymentId,
}

impl Job {
    /// A fresh pending deployment job.
    pub fn deployment(deployment_id: DeploymentId, data: JobData, at: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            kind: JobKind::Deployment,
            status: JobStatus::Pending,
            data,
            created_at: at,
            started_at: None,
            completed_at: None,
            error_message: None,
            deployment_id,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
