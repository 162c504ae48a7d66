//! Axum middleware that admits only requests with a verified bearer token.

use super::TokenVerifier;
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Extract `{token}` from `Authorization: Bearer {token}`.
fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            warn!("Authorization header is not provided in the request");
            AppError::unauthorized("Authorization header is not provided in the request")
        })?;

    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Ok(token.to_string()),
        _ => {
            warn!("Authorization header format must be Bearer {{token}}");
            Err(AppError::unauthorized(
                "Authorization header format must be Bearer {token}",
            ))
        }
    }
}

pub async fn require_bearer<V: TokenVerifier>(
    State(verifier): State<V>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;
    match verifier.verify(&token).await {
        Ok(true) => Ok(next.run(request).await),
        Ok(false) => {
            warn!("Token validation failed");
            Err(AppError::unauthorized("Token validation failed"))
        }
        Err(err) => {
            warn!(error = %err, "Token validation failed");
            Err(AppError::unauthorized(err.to_string()))
        }
    }
}
