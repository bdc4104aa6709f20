//! Authentication middleware for Axum

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::auth::JwtAuth;

/// Authentication state shared across requests
#[derive(Clone)]
pub struct AuthState {
    pub jwt_auth: Arc<JwtAuth>,
}

impl AuthState {
    pub fn new(secret: &str) -> Self {
        Self {
            jwt_auth: Arc::new(JwtAuth::new(secret)),
        }
    }
}

/// Identifies the requester when a bearer token is presented
///
/// Requests without an `Authorization` header pass through anonymously.
/// A header that is present but malformed or carries an invalid token is
/// rejected with `401`.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(auth_header) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let auth_header = auth_header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
    let token = JwtAuth::bearer_token(auth_header).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let requester = state.jwt_auth.verify(token).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(requester);

    Ok(next.run(request).await)
}
