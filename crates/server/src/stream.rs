// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSE log streaming.
//!
//! A poller bridges the store to each observer: on attach it replays
//! the latest 50 logs, then polls every second (100 rows per poll) and
//! forwards only rows beyond the cursor. Named events: `connected`,
//! `log`, `heartbeat`, `error`. The stream ends when the observer
//! disconnects, or once the deployment is terminal and every log up to
//! that point has been emitted.

use std::convert::Infallible;
use std::time::Duration;

use axum::http::header;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use dk_core::{DeploymentId, DeploymentLog, LogId};

use crate::error::ApiError;
use crate::AppState;

/// Initial catch-up depth on attach.
const CATCH_UP_LIMIT: i64 = 50;
/// Rows per poll.
const POLL_LIMIT: i64 = 100;
/// Poll cadence; heartbeats ride the same tick.
const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Observer buffer; a slow observer back-pressures the poller rather
/// than losing rows.
const CHANNEL_CAPACITY: usize = 64;

/// Strictly-advancing log cursor: emission order is `(created_at, id)`
/// and a row is emitted at most once per observer.
#[derive(Debug, Default)]
pub struct LogCursor {
    last: Option<LogId>,
}

impl LogCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The id high-water mark, for `list_logs_after` queries.
    pub fn last(&self) -> Option<LogId> {
        self.last
    }

    /// Order a batch, drop rows at or below the high-water mark, and
    /// advance it. The database query already filters on id, but the
    /// cursor re-checks so retried polls can never re-emit or reorder.
    pub fn admit(&mut self, mut batch: Vec<DeploymentLog>) -> Vec<DeploymentLog> {
        batch.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let fresh: Vec<DeploymentLog> = batch
            .into_iter()
            .filter(|log| self.last.is_none_or(|last| log.id > last))
            .collect();
        if let Some(max) = fresh.iter().map(|l| l.id).max() {
            self.last = Some(max);
        }
        fresh
    }
}

/// GET `.../logs` with `Accept: text/event-stream`.
pub async fn sse_logs(
    state: AppState,
    deployment_id: DeploymentId,
) -> Result<impl IntoResponse, ApiError> {
    // Fail fast with a JSON 404 before committing to a stream.
    state.store.get_deployment(deployment_id).await?;

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(CHANNEL_CAPACITY);
    tokio::spawn(stream_task(state, deployment_id, tx));

    let sse = Sse::new(ReceiverStream::new(rx));
    Ok(([(header::CACHE_CONTROL, "no-cache")], sse))
}

async fn stream_task(
    state: AppState,
    deployment_id: DeploymentId,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) {
    let send = |event: Event| {
        let tx = tx.clone();
        async move { tx.send(Ok(event)).await.is_ok() }
    };

    let connected = named_json(
        "connected",
        &json!({
            "deployment_id": deployment_id,
            "timestamp": Utc::now().to_rfc3339(),
        }),
    );
    if !send(connected).await {
        return;
    }

    let mut cursor = LogCursor::new();

    // Initial catch-up: the latest rows, oldest first.
    match state.store.latest_logs(deployment_id, CATCH_UP_LIMIT).await {
        Ok(batch) => {
            for log in cursor.admit(batch) {
                if !send(log_event(&log)).await {
                    return;
                }
            }
        }
        Err(e) => {
            let _ = send(error_event(&e.to_string())).await;
            return;
        }
    }

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // immediate first tick

    loop {
        ticker.tick().await;

        let terminal = match state.store.get_deployment(deployment_id).await {
            Ok(deployment) => deployment.status.is_terminal(),
            Err(e) => {
                let _ = send(error_event(&e.to_string())).await;
                return;
            }
        };

        let batch = match state
            .store
            .list_logs_after(deployment_id, cursor.last(), POLL_LIMIT)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                let _ = send(error_event(&e.to_string())).await;
                return;
            }
        };

        let fresh = cursor.admit(batch);
        let drained = fresh.is_empty();
        for log in fresh {
            if !send(log_event(&log)).await {
                return;
            }
        }

        let heartbeat = named_json("heartbeat", &json!({"timestamp": Utc::now().to_rfc3339()}));
        if !send(heartbeat).await {
            return;
        }

        // Terminal status was read before the poll, so an empty poll
        // means every log up to the terminal state has been emitted.
        if terminal && drained {
            tracing::debug!(deployment_id = %deployment_id, "log stream complete");
            return;
        }
    }
}

fn log_event(log: &DeploymentLog) -> Event {
    match Event::default().event("log").json_data(log) {
        Ok(event) => event,
        Err(_) => error_event("failed to encode log row"),
    }
}

fn error_event(message: &str) -> Event {
    Event::default().event("error").data(message)
}

fn named_json(name: &str, payload: &serde_json::Value) -> Event {
    match Event::default().event(name).json_data(payload) {
        Ok(event) => event,
        Err(_) => Event::default().event(name).data("{}"),
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
