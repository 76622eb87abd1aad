// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Postgres deployment store.
//!
//! The store is the sole durable authority for deployments, their step
//! rows, and their append-only logs. The schema lives in
//! `migrations/0001_init.sql` and is applied out of band.

mod deployments;
mod error;
mod logs;
mod rows;
mod steps;

pub use error::StoreError;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Handle to the Postgres store. Cheap to clone; wraps a connection
/// pool.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connect a pool to the given database URL.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests, shared pools).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
