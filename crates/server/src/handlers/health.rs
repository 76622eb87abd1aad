// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::AppState;

/// GET /health and /api/v1/health. Reports each backing service; 503
/// when either dependency fails its ping.
pub async fn health(State(state): State<AppState>) -> Response {
    let database = state.store.ping().await.is_ok();
    let redis = state.queue.ping().await.is_ok();
    let healthy = database && redis;

    let body = json!({
        "status": if healthy { "ok" } else { "degraded" },
        "services": {
            "database": service_label(database),
            "redis": service_label(redis),
        },
    });

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

fn service_label(up: bool) -> &'static str {
    if up {
        "up"
    } else {
        "down"
    }
}
