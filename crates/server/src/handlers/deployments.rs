// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment endpoints.
//!
//! Creation accepts either a multipart form (with an optional
//! `env_file` upload) or, for backward compatibility, a JSON body
//! carrying `environment_vars` in env-file syntax.

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, RequestExt};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use dk_core::{DeploymentId, DeploymentView};
use dk_engine::CreateRequest;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::{stream, upload, AppState};

/// JSON creation body. `port` may arrive as a string or a number.
#[derive(Debug, Deserialize)]
pub struct CreateDeploymentBody {
    pub target_ip: String,
    pub ssh_username: String,
    pub ssh_password: String,
    pub github_repo_url: String,
    pub github_pat: String,
    pub github_branch: String,
    pub port: PortValue,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub deployment_name: Option<String>,
    #[serde(default)]
    pub additional_vars: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub environment_vars: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u64),
    Text(String),
}

impl PortValue {
    pub fn into_string(self) -> String {
        match self {
            PortValue::Number(n) => n.to_string(),
            PortValue::Text(s) => s,
        }
    }
}

impl From<CreateDeploymentBody> for CreateRequest {
    fn from(body: CreateDeploymentBody) -> Self {
        CreateRequest {
            target_ip: body.target_ip,
            ssh_username: body.ssh_username,
            ssh_password: body.ssh_password,
            github_repo_url: body.github_repo_url,
            github_pat: body.github_pat,
            github_branch: body.github_branch,
            port: body.port.into_string(),
            container_name: body.container_name,
            project_name: body.project_name,
            deployment_name: body.deployment_name,
            additional_vars: body.additional_vars,
            environment_vars: body.environment_vars,
            env_file_path: None,
            user_id: None,
        }
    }
}

/// POST /api/v1/deployments
pub async fn create_deployment(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    request: Request,
) -> Result<Response, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut create = if content_type.starts_with("multipart/form-data") {
        let multipart = request
            .extract::<Multipart, _>()
            .await
            .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?;
        read_multipart(multipart).await?
    } else {
        let Json(body) = request
            .extract::<Json<CreateDeploymentBody>, _>()
            .await
            .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;
        CreateRequest::from(body)
    };
    create.user_id = Some(user_id);

    let view = state.coordinator.create(create).await?;
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

/// Collect multipart fields into a creation request, spooling an
/// `env_file` part to the local temp directory.
async fn read_multipart(mut multipart: Multipart) -> Result<CreateRequest, ApiError> {
    let mut create = CreateRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart field: {e}")))?
    {
        let Some(name) = field.name().map(String::from) else {
            continue;
        };
        match name.as_str() {
            "env_file" => {
                let file_name = field.file_name().unwrap_or("env").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read env_file: {e}")))?;
                if bytes.is_empty() {
                    continue;
                }
                let path = upload::save_env_file(&upload::env_file_dir(), &file_name, &bytes)
                    .await
                    .map_err(|e| {
                        ApiError::Internal(format!("failed to save environment file: {e}"))
                    })?;
                tracing::info!(path = %path.display(), "environment file uploaded");
                create.env_file_path = Some(path);
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read {other}: {e}")))?;
                match other {
                    "target_ip" => create.target_ip = value,
                    "ssh_username" => create.ssh_username = value,
                    "ssh_password" => create.ssh_password = value,
                    "github_repo_url" => create.github_repo_url = value,
                    "github_pat" => create.github_pat = value,
                    "github_branch" => create.github_branch = value,
                    "port" => create.port = value,
                    "container_name" => create.container_name = some_nonempty(value),
                    "project_name" => create.project_name = some_nonempty(value),
                    "deployment_name" => create.deployment_name = some_nonempty(value),
                    "environment_vars" => create.environment_vars = some_nonempty(value),
                    _ => {} // unknown fields are ignored
                }
            }
        }
    }

    Ok(create)
}

fn some_nonempty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /api/v1/deployments
pub async fn list_deployments(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(page): Query<Pagination>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = page.limit.clamp(1, 200);
    let offset = page.offset.max(0);
    let deployments = state
        .store
        .list_deployments_by_user(user_id, limit, offset)
        .await?;
    let views: Vec<DeploymentView> = deployments.iter().map(DeploymentView::from).collect();
    let count = views.len();
    Ok(Json(json!({
        "deployments": views,
        "limit": limit,
        "offset": offset,
        "count": count,
    })))
}

/// GET /api/v1/deployments/:id
pub async fn get_deployment(
    State(state): State<AppState>,
    Path(id): Path<DeploymentId>,
) -> Result<Json<DeploymentView>, ApiError> {
    let deployment = state.store.get_deployment(id).await?;
    Ok(Json(DeploymentView::from(&deployment)))
}

/// GET /api/v1/deployments/:id/steps
pub async fn get_steps(
    State(state): State<AppState>,
    Path(id): Path<DeploymentId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.get_deployment(id).await?;
    let steps = state.store.list_steps(id).await?;
    Ok(Json(json!({
        "deployment_id": id,
        "steps": steps,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}

fn default_log_limit() -> i64 {
    100
}

/// GET /api/v1/deployments/:id/logs
///
/// `Accept: text/event-stream` upgrades to the SSE stream; anything
/// else returns a bounded JSON list.
pub async fn get_logs(
    State(state): State<AppState>,
    Path(id): Path<DeploymentId>,
    Query(query): Query<LogsQuery>,
    headers: axum::http::HeaderMap,
) -> Result<Response, ApiError> {
    let wants_stream = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"));

    if wants_stream {
        return Ok(stream::sse_logs(state, id).await?.into_response());
    }

    state.store.get_deployment(id).await?;
    let logs = state
        .store
        .list_logs(id, query.limit.clamp(1, 1000))
        .await?;
    Ok(Json(json!({
        "deployment_id": id,
        "logs": logs,
    }))
    .into_response())
}

/// POST /api/v1/deployments/:id/cancel
///
/// Raises the cancel flag; the worker honors it at its next step
/// boundary, so the transition to `aborted` is asynchronous.
pub async fn cancel_deployment(
    State(state): State<AppState>,
    Path(id): Path<DeploymentId>,
) -> Result<Response, ApiError> {
    let deployment = state.store.get_deployment(id).await?;
    if deployment.status.is_terminal() {
        return Err(ApiError::BadRequest(format!(
            "deployment is already {}",
            deployment.status
        )));
    }

    state.queue.request_cancel(id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "deployment_id": id,
            "status": "cancellation_requested",
        })),
    )
        .into_response())
}

#[cfg(test)]
#[path = "deployments_tests.rs"]
mod tests;
