// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Row lookup by id found nothing.
    #[error("deployment not found")]
    NotFound,

    /// A stored string did not parse back into its domain type.
    #[error("corrupt row: {0}")]
    Corrupt(#[from] dk_core::ParseStatusError),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}
