// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations: wire config to infrastructure, run,
//! shut down cleanly on SIGINT/SIGTERM.

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use dk_core::{Config, SystemClock};
use dk_engine::{SshConnector, StepRunner, Worker};
use dk_queue::DeploymentQueue;
use dk_server::{build_router, AppState};
use dk_storage::Store;

/// Run the API server until a shutdown signal arrives, then drain.
pub async fn server(config: Config) -> anyhow::Result<()> {
    let store = Store::connect(&config.database_url())
        .await
        .context("failed to connect to Postgres")?;
    let queue = DeploymentQueue::connect(&config.redis_url())
        .await
        .context("failed to connect to Redis")?;

    let state = AppState::new(store.clone(), queue, config.auth.jwt_secret.clone());
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "deployknot server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    store.close().await;
    info!("server shutdown complete");
    Ok(())
}

/// Run a worker until a shutdown signal arrives. The in-flight job
/// finishes its current suspension point before the loop exits.
pub async fn worker(config: Config) -> anyhow::Result<()> {
    let store = Store::connect(&config.database_url())
        .await
        .context("failed to connect to Postgres")?;
    let queue = DeploymentQueue::connect(&config.redis_url())
        .await
        .context("failed to connect to Redis")?;

    let cancel = CancellationToken::new();
    let runner = StepRunner::new(store.clone(), queue.clone(), SshConnector, SystemClock);
    let worker = Worker::new(runner, queue, cancel.clone());

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_cancel.cancel();
    });

    worker.run().await;
    store.close().await;
    info!("worker shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to register SIGTERM handler");
                return std::future::pending::<()>().await;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to register SIGINT handler");
                return std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
