// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker loop: block on the queue, run jobs, survive everything.
//!
//! Multiple workers may run against the same queue; each pop delivers
//! to exactly one of them. Shutdown is cooperative via a cancellation
//! token; an in-flight job finishes its current suspension point
//! before the loop exits.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dk_core::{Clock, Job, JobStatus};

use crate::ports::{Connector, DeploymentStore, JobQueue};
use crate::runner::StepRunner;

const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(30);
const DEQUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(5);
const EMPTY_QUEUE_PAUSE: Duration = Duration::from_secs(1);

pub struct Worker<S, Q, C, K> {
    runner: Arc<StepRunner<S, Q, C, K>>,
    queue: Q,
    cancel: CancellationToken,
    dequeue_timeout: Duration,
}

impl<S, Q, C, K> Worker<S, Q, C, K>
where
    S: DeploymentStore,
    Q: JobQueue,
    C: Connector,
    K: Clock,
{
    pub fn new(runner: StepRunner<S, Q, C, K>, queue: Q, cancel: CancellationToken) -> Self {
        Self {
            runner: Arc::new(runner),
            queue,
            cancel,
            dequeue_timeout: DEQUEUE_TIMEOUT,
        }
    }

    /// Shrink the blocking-pop window (tests).
    pub fn with_dequeue_timeout(mut self, timeout: Duration) -> Self {
        self.dequeue_timeout = timeout;
        self
    }

    /// Run until cancelled. Never returns an error: every failure is
    /// absorbed, recorded, and followed by the next iteration.
    pub async fn run(&self) {
        tracing::info!("starting deployment worker");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("worker cancelled, shutting down");
                    return;
                }
                popped = self.queue.dequeue(self.dequeue_timeout) => match popped {
                    Ok(Some(job)) => self.handle(job).await,
                    Ok(None) => self.idle(EMPTY_QUEUE_PAUSE).await,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to dequeue job");
                        self.idle(DEQUEUE_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }

    async fn handle(&self, job: Job) {
        tracing::info!(job_id = %job.id, deployment_id = %job.deployment_id, "processing job");

        if let Err(e) = self.runner.process(&job).await {
            tracing::error!(
                job_id = %job.id,
                deployment_id = %job.deployment_id,
                error = %e,
                "deployment job failed"
            );
            // The runner already failed the deployment; make sure the
            // job record agrees even if the runner fell over before
            // reaching its own update.
            if let Err(qe) = self
                .queue
                .update_job(job.id, JobStatus::Failed, Some(&e.to_string()))
                .await
            {
                tracing::error!(job_id = %job.id, error = %qe, "failed to update job record");
            }
        }

        self.cleanup_local_env(&job).await;
    }

    /// Delete the server-side temp copy of an uploaded env file once
    /// its job is terminal. Best-effort: the file lives in a temp dir
    /// either way.
    async fn cleanup_local_env(&self, job: &Job) {
        if let Some(path) = &job.data.env_file_path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "removed local env file");
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "local env file cleanup skipped");
                }
            }
        }
    }

    /// Sleep, but wake immediately on cancellation.
    async fn idle(&self, pause: Duration) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(pause) => {}
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
