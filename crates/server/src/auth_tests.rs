// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::ApiError;
use chrono::Duration;
use dk_core::UserId;

#[test]
fn token_round_trip() {
    let user = UserId::new();
    let token = issue_token(user, "secret", Duration::minutes(5));
    let claims = decode_token(&token, "secret").unwrap();
    assert_eq!(claims.sub, user.0);
}

#[test]
fn wrong_secret_is_rejected() {
    let token = issue_token(UserId::new(), "secret", Duration::minutes(5));
    assert!(matches!(
        decode_token(&token, "other"),
        Err(ApiError::Unauthorized(_))
    ));
}

#[test]
fn expired_token_is_rejected() {
    let token = issue_token(UserId::new(), "secret", Duration::minutes(-10));
    assert!(matches!(
        decode_token(&token, "secret"),
        Err(ApiError::Unauthorized(_))
    ));
}

#[test]
fn garbage_is_rejected() {
    assert!(matches!(
        decode_token("not-a-jwt", "secret"),
        Err(ApiError::Unauthorized(_))
    ));
}
