// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token authentication middleware.
//!
//! User registration and password handling live outside this service;
//! the server only validates the HS256 bearer tokens the auth service
//! issues and resolves the authenticated user id that ownership
//! queries need.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dk_core::UserId;

use crate::error::ApiError;
use crate::AppState;

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    /// Expiry, seconds since epoch.
    pub exp: i64,
}

/// Reject the request unless it carries a valid bearer token; on
/// success the [`AuthUser`] is available to handlers as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".to_string()))?;

    let claims = decode_token(token, &state.jwt_secret)?;
    request
        .extensions_mut()
        .insert(AuthUser(UserId(claims.sub)));
    Ok(next.run(request).await)
}

/// Validate a token and return its claims. Expiry is enforced.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| ApiError::Unauthorized(format!("invalid token: {e}")))
}

/// Issue a token for a user. The auth service is the production
/// issuer; this exists for tests and local tooling.
pub fn issue_token(user_id: UserId, secret: &str, ttl: Duration) -> String {
    let claims = Claims {
        sub: user_id.0,
        exp: (Utc::now() + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap_or_default()
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
