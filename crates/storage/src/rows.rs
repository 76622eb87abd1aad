// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row types and conversions.
//!
//! Statuses and step names are stored as text; conversion back into the
//! domain enums is fallible and surfaces as [`StoreError::Corrupt`]
//! rather than panicking on unexpected rows.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

use dk_core::{Deployment, DeploymentLog, DeploymentStep};

use crate::error::StoreError;

#[derive(Debug, FromRow)]
pub(crate) struct DeploymentRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: String,
    pub target_ip: String,
    pub ssh_username: String,
    pub ssh_password_encrypted: Option<String>,
    pub github_repo_url: String,
    pub github_pat_encrypted: Option<String>,
    pub github_branch: String,
    pub additional_vars: Option<serde_json::Value>,
    pub port: i32,
    pub container_name: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_by: Option<String>,
    pub project_name: Option<String>,
    pub deployment_name: Option<String>,
    pub user_id: Option<Uuid>,
}

impl TryFrom<DeploymentRow> for Deployment {
    type Error = StoreError;

    fn try_from(row: DeploymentRow) -> Result<Self, Self::Error> {
        let additional_vars = match row.additional_vars {
            Some(value) => serde_json::from_value::<BTreeMap<String, String>>(value).ok(),
            None => None,
        };
        Ok(Deployment {
            id: row.id.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            status: row.status.parse()?,
            target_ip: row.target_ip,
            ssh_username: row.ssh_username,
            ssh_password: row.ssh_password_encrypted.unwrap_or_default(),
            github_repo_url: row.github_repo_url,
            github_pat: row.github_pat_encrypted.unwrap_or_default(),
            github_branch: row.github_branch,
            additional_vars,
            port: row.port.clamp(0, u16::MAX as i32) as u16,
            container_name: row.container_name,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            created_by: row.created_by,
            project_name: row.project_name,
            deployment_name: row.deployment_name,
            user_id: row.user_id.map(Into::into),
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct StepRow {
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub step_name: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub error_message: Option<String>,
    pub step_order: i32,
}

impl TryFrom<StepRow> for DeploymentStep {
    type Error = StoreError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        Ok(DeploymentStep {
            id: row.id.into(),
            deployment_id: row.deployment_id.into(),
            step_name: row.step_name.parse()?,
            status: row.status.parse()?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_ms: row.duration_ms,
            error_message: row.error_message,
            step_order: row.step_order,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct LogRow {
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub log_level: String,
    pub message: String,
    pub task_name: Option<String>,
    pub step_order: Option<i32>,
}

impl TryFrom<LogRow> for DeploymentLog {
    type Error = StoreError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(DeploymentLog {
            id: row.id.into(),
            deployment_id: row.deployment_id.into(),
            created_at: row.created_at,
            log_level: row.log_level.parse()?,
            message: row.message,
            task_name: row.task_name,
            step_order: row.step_order,
        })
    }
}

#[cfg(test)]
#[path = "rows_tests.rs"]
mod tests;
