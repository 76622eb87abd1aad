// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axum::http::StatusCode;

#[test]
fn status_mapping() {
    assert_eq!(
        ApiError::BadRequest("x".into()).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        ApiError::Unauthorized("x".into()).status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    assert_eq!(
        ApiError::Internal("x".into()).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn store_not_found_becomes_404() {
    let err: ApiError = StoreError::NotFound.into();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn create_validation_becomes_400_but_store_failures_stay_500() {
    let err: ApiError = CreateError::InvalidPort("99999".into()).into();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let err: ApiError = CreateError::MissingField("target_ip").into();
    assert!(matches!(err, ApiError::BadRequest(_)));

    let err: ApiError = CreateError::Store(StoreError::NotFound).into();
    assert!(matches!(err, ApiError::Internal(_)));
}
