// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step table operations.

use dk_core::{DeploymentId, DeploymentStep};

use crate::error::StoreError;
use crate::rows::StepRow;
use crate::Store;

impl Store {
    /// Persist the full state of a step row by id.
    pub async fn update_step(&self, step: &DeploymentStep) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE deployment_steps
             SET status = $2, started_at = $3, completed_at = $4,
                 duration_ms = $5, error_message = $6
             WHERE id = $1",
        )
        .bind(step.id.0)
        .bind(step.status.as_str())
        .bind(step.started_at)
        .bind(step.completed_at)
        .bind(step.duration_ms)
        .bind(&step.error_message)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// All steps of a deployment in pipeline order.
    pub async fn list_steps(
        &self,
        deployment_id: DeploymentId,
    ) -> Result<Vec<DeploymentStep>, StoreError> {
        let rows: Vec<StepRow> = sqlx::query_as(
            "SELECT id, deployment_id, step_name, status, started_at, completed_at,
                    duration_ms, error_message, step_order
             FROM deployment_steps
             WHERE deployment_id = $1
             ORDER BY step_order ASC",
        )
        .bind(deployment_id.0)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
