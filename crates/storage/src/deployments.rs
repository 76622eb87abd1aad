// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment table operations.

use chrono::{DateTime, Utc};

use dk_core::{Deployment, DeploymentId, DeploymentStatus, DeploymentStep, UserId};

use crate::error::StoreError;
use crate::rows::DeploymentRow;
use crate::Store;

const DEPLOYMENT_COLUMNS: &str = "id, created_at, updated_at, status, target_ip, ssh_username, \
     ssh_password_encrypted, github_repo_url, github_pat_encrypted, github_branch, \
     additional_vars, port, container_name, started_at, completed_at, error_message, \
     created_by, project_name, deployment_name, user_id";

impl Store {
    /// Insert a deployment and its pending step rows in one
    /// transaction. Either everything lands or nothing does; a
    /// deployment without its steps would violate the four-steps
    /// invariant every reader relies on.
    pub async fn create_deployment(
        &self,
        deployment: &Deployment,
        steps: &[DeploymentStep],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await?;

        let additional_vars = deployment
            .additional_vars
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .unwrap_or(None);

        sqlx::query(
            "INSERT INTO deployments (
                 id, created_at, updated_at, status, target_ip, ssh_username,
                 ssh_password_encrypted, github_repo_url, github_pat_encrypted,
                 github_branch, additional_vars, port, container_name,
                 created_by, project_name, deployment_name, user_id
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(deployment.id.0)
        .bind(deployment.created_at)
        .bind(deployment.updated_at)
        .bind(deployment.status.as_str())
        .bind(&deployment.target_ip)
        .bind(&deployment.ssh_username)
        .bind(&deployment.ssh_password)
        .bind(&deployment.github_repo_url)
        .bind(&deployment.github_pat)
        .bind(&deployment.github_branch)
        .bind(additional_vars)
        .bind(deployment.port as i32)
        .bind(&deployment.container_name)
        .bind(&deployment.created_by)
        .bind(&deployment.project_name)
        .bind(&deployment.deployment_name)
        .bind(deployment.user_id.map(|u| u.0))
        .execute(&mut *tx)
        .await?;

        for step in steps {
            sqlx::query(
                "INSERT INTO deployment_steps (
                     id, deployment_id, step_name, status, step_order
                 ) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(step.id.0)
            .bind(step.deployment_id.0)
            .bind(step.step_name.as_str())
            .bind(step.status.as_str())
            .bind(step.step_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Fetch one deployment by id, secrets included; callers exposing
    /// it over a read API must go through `DeploymentView`.
    pub async fn get_deployment(&self, id: DeploymentId) -> Result<Deployment, StoreError> {
        let row: DeploymentRow = sqlx::query_as(&format!(
            "SELECT {DEPLOYMENT_COLUMNS} FROM deployments WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_one(self.pool())
        .await?;
        row.try_into()
    }

    /// Page through a user's deployments, newest first.
    pub async fn list_deployments_by_user(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Deployment>, StoreError> {
        let rows: Vec<DeploymentRow> = sqlx::query_as(&format!(
            "SELECT {DEPLOYMENT_COLUMNS} FROM deployments
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id.0)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Update status and error message, bumping `updated_at`.
    pub async fn update_deployment_status(
        &self,
        id: DeploymentId,
        status: DeploymentStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE deployments SET status = $2, updated_at = $3, error_message = $4
             WHERE id = $1",
        )
        .bind(id.0)
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(error_message)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Stamp `started_at` and/or `completed_at`. `None` leaves the
    /// column untouched, so the first-step stamp can't be erased by the
    /// terminal stamp.
    pub async fn update_deployment_timing(
        &self,
        id: DeploymentId,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE deployments
             SET started_at = COALESCE($2, started_at),
                 completed_at = COALESCE($3, completed_at),
                 updated_at = $4
             WHERE id = $1",
        )
        .bind(id.0)
        .bind(started_at)
        .bind(completed_at)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
