// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log table operations.
//!
//! Logs are append-only. All reads order by `(created_at, id)`, which
//! is the defined emission order for observers; ids are UUIDv7 so the
//! id tiebreak agrees with append order.

use dk_core::{DeploymentId, DeploymentLog, LogId};

use crate::error::StoreError;
use crate::rows::LogRow;
use crate::Store;

const LOG_COLUMNS: &str =
    "id, deployment_id, created_at, log_level, message, task_name, step_order";

impl Store {
    /// Append one log row.
    pub async fn append_log(&self, log: &DeploymentLog) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO deployment_logs (
                 id, deployment_id, created_at, log_level, message, task_name, step_order
             ) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(log.id.0)
        .bind(log.deployment_id.0)
        .bind(log.created_at)
        .bind(log.log_level.as_str())
        .bind(&log.message)
        .bind(&log.task_name)
        .bind(log.step_order)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Oldest logs first, bounded.
    pub async fn list_logs(
        &self,
        deployment_id: DeploymentId,
        limit: i64,
    ) -> Result<Vec<DeploymentLog>, StoreError> {
        let rows: Vec<LogRow> = sqlx::query_as(&format!(
            "SELECT {LOG_COLUMNS} FROM deployment_logs
             WHERE deployment_id = $1
             ORDER BY created_at ASC, id ASC
             LIMIT $2"
        ))
        .bind(deployment_id.0)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// The most recent `limit` logs, returned in emission order. Used
    /// for the stream's initial catch-up.
    pub async fn latest_logs(
        &self,
        deployment_id: DeploymentId,
        limit: i64,
    ) -> Result<Vec<DeploymentLog>, StoreError> {
        let rows: Vec<LogRow> = sqlx::query_as(&format!(
            "SELECT {LOG_COLUMNS} FROM (
                 SELECT {LOG_COLUMNS} FROM deployment_logs
                 WHERE deployment_id = $1
                 ORDER BY created_at DESC, id DESC
                 LIMIT $2
             ) recent
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(deployment_id.0)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Incremental read for the stream cursor: rows with id strictly
    /// greater than `after`, in emission order, bounded.
    pub async fn list_logs_after(
        &self,
        deployment_id: DeploymentId,
        after: Option<LogId>,
        limit: i64,
    ) -> Result<Vec<DeploymentLog>, StoreError> {
        let rows: Vec<LogRow> = match after {
            Some(cursor) => {
                sqlx::query_as(&format!(
                    "SELECT {LOG_COLUMNS} FROM deployment_logs
                     WHERE deployment_id = $1 AND id > $2
                     ORDER BY created_at ASC, id ASC
                     LIMIT $3"
                ))
                .bind(deployment_id.0)
                .bind(cursor.0)
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {LOG_COLUMNS} FROM deployment_logs
                     WHERE deployment_id = $1
                     ORDER BY created_at ASC, id ASC
                     LIMIT $2"
                ))
                .bind(deployment_id.0)
                .bind(limit)
                .fetch_all(self.pool())
                .await?
            }
        };
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
