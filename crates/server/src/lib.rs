// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP API server.
//!
//! Thin glue over the engine: request parsing, bearer-token auth,
//! multipart env-file upload, and the SSE log stream. Everything
//! behind `/api/v1` except `/api/v1/health` requires a bearer token.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod stream;
pub mod upload;

pub use error::ApiError;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use dk_core::SystemClock;
use dk_engine::Coordinator;
use dk_queue::DeploymentQueue;
use dk_storage::Store;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub queue: DeploymentQueue,
    pub coordinator: Coordinator<Store, DeploymentQueue, SystemClock>,
    pub jwt_secret: Arc<String>,
}

impl AppState {
    pub fn new(store: Store, queue: DeploymentQueue, jwt_secret: String) -> Self {
        let coordinator = Coordinator::new(store.clone(), queue.clone(), SystemClock);
        Self {
            store,
            queue,
            coordinator,
            jwt_secret: Arc::new(jwt_secret),
        }
    }
}

/// Assemble the full router.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/deployments",
            post(handlers::deployments::create_deployment)
                .get(handlers::deployments::list_deployments),
        )
        .route("/deployments/:id", get(handlers::deployments::get_deployment))
        .route("/deployments/:id/steps", get(handlers::deployments::get_steps))
        .route("/deployments/:id/logs", get(handlers::deployments::get_logs))
        .route("/deployments/:id/cancel", post(handlers::deployments::cancel_deployment))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health::health))
        .merge(protected);

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
