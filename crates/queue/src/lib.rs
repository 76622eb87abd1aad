// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis job queue.
//!
//! A single FIFO list holds serialized job envelopes: producers LPUSH,
//! workers BRPOP, so delivery is at-least-once with each pop going to
//! exactly one worker. Alongside the list, every job gets a diagnostic
//! record keyed by job id with a 24 h TTL, and cancellation requests
//! are flagged under a per-deployment key the worker polls between
//! steps.

mod keys;

pub use keys::{cancel_key, job_key, QUEUE_KEY};

use chrono::Utc;
use redis::AsyncCommands;
use std::time::Duration;
use thiserror::Error;

use dk_core::{DeploymentId, Job, JobId, JobStatus};

/// TTL for per-job diagnostic records and cancel flags.
const RECORD_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("malformed job envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// Handle to the deployment queue. Cheap to clone; wraps a multiplexed
/// connection.
#[derive(Clone)]
pub struct DeploymentQueue {
    conn: redis::aio::MultiplexedConnection,
}

impl DeploymentQueue {
    /// Connect to Redis at the given URL.
    pub async fn connect(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    /// Push a job to the head of the queue and write its diagnostic
    /// record. The record write is best-effort: the job is already
    /// queued, so a record failure only costs observability.
    pub async fn enqueue(&self, job: &Job) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload).await?;

        if let Err(e) = conn
            .set_ex::<_, _, ()>(job_key(job.id), &payload, RECORD_TTL_SECS)
            .await
        {
            tracing::warn!(job_id = %job.id, error = %e, "failed to store job record");
        }

        tracing::info!(
            job_id = %job.id,
            deployment_id = %job.deployment_id,
            "job enqueued"
        );
        Ok(())
    }

    /// Block-pop from the tail, up to `timeout`. Returns `None` on
    /// timeout. On delivery the job record transitions to `running`
    /// with `started_at` stamped.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<Job>, QueueError> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> =
            conn.brpop(QUEUE_KEY, timeout.as_secs_f64()).await?;

        let Some((_, payload)) = popped else {
            return Ok(None);
        };

        let mut job: Job = serde_json::from_str(&payload)?;
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());

        if let Ok(updated) = serde_json::to_string(&job) {
            if let Err(e) = conn
                .set_ex::<_, _, ()>(job_key(job.id), updated, RECORD_TTL_SECS)
                .await
            {
                tracing::warn!(job_id = %job.id, error = %e, "failed to update job record");
            }
        }

        tracing::info!(
            job_id = %job.id,
            deployment_id = %job.deployment_id,
            "job dequeued"
        );
        Ok(Some(job))
    }

    /// Mutate the per-job diagnostic record; terminal statuses stamp
    /// `completed_at`.
    pub async fn update_job(
        &self,
        job_id: JobId,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(job_key(job_id)).await?;
        let payload = payload.ok_or(QueueError::JobNotFound(job_id))?;

        let mut job: Job = serde_json::from_str(&payload)?;
        job.status = status;
        job.error_message = error_message.map(String::from);
        if matches!(status, JobStatus::Completed | JobStatus::Failed) {
            job.completed_at = Some(Utc::now());
        }

        conn.set_ex::<_, _, ()>(job_key(job_id), serde_json::to_string(&job)?, RECORD_TTL_SECS)
            .await?;

        tracing::info!(job_id = %job_id, status = ?status, "job record updated");
        Ok(())
    }

    /// Read back a job's diagnostic record.
    pub async fn job(&self, job_id: JobId) -> Result<Job, QueueError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(job_key(job_id)).await?;
        let payload = payload.ok_or(QueueError::JobNotFound(job_id))?;
        Ok(serde_json::from_str(&payload)?)
    }

    /// Number of queued (not yet popped) jobs.
    pub async fn len(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(QUEUE_KEY).await?)
    }

    /// Raise the cancel flag for a deployment. The worker observes it
    /// before starting each step.
    pub async fn request_cancel(&self, deployment_id: DeploymentId) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(cancel_key(deployment_id), "1", RECORD_TTL_SECS)
            .await?;
        tracing::info!(deployment_id = %deployment_id, "cancellation requested");
        Ok(())
    }

    /// Check whether cancellation has been requested for a deployment.
    pub async fn is_cancel_requested(
        &self,
        deployment_id: DeploymentId,
    ) -> Result<bool, QueueError> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(cancel_key(deployment_id)).await?)
    }

    /// Liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}
