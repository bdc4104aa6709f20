//! API routes for the querymemo server

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use querymemo_cache::{CacheStats, QueryCache};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use super::auth::{Requester, DEFAULT_TOKEN_HOURS};
use super::query_cache::PendingCache;
use crate::backend::QueryBackend;

/// Application state
pub struct AppState {
    pub cache: Arc<QueryCache>,
    pub backend: Arc<dyn QueryBackend>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in_hours: i64,
}

/// Query body; `message` wins over `query`
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    pub message: Option<String>,
    pub query: Option<String>,
}

/// Query-string form of a query
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub q: Option<String>,
}

/// Answer envelope; the interceptor caches `data`
#[derive(Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub data: Value,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Login endpoint: issues a requester token for any non-empty credentials
pub async fn login(
    State(auth_state): State<super::middleware::AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let token = auth_state
        .jwt_auth
        .issue(&payload.username, Some(DEFAULT_TOKEN_HOURS))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse {
        token,
        expires_in_hours: DEFAULT_TOKEN_HOURS,
    }))
}

/// `POST /api/query`
pub async fn query_post(
    State(app_state): State<Arc<AppState>>,
    pending: Option<Extension<PendingCache>>,
    requester: Option<Extension<Requester>>,
    Json(body): Json<QueryRequest>,
) -> Response {
    let text = pending
        .map(|Extension(p)| p.query)
        .or_else(|| non_empty(body.message))
        .or_else(|| non_empty(body.query));

    answer(&app_state, text, requester.map(|Extension(r)| r)).await
}

/// `GET /api/query?q=`
pub async fn query_get(
    State(app_state): State<Arc<AppState>>,
    pending: Option<Extension<PendingCache>>,
    requester: Option<Extension<Requester>>,
    Query(params): Query<QueryParams>,
) -> Response {
    let text = pending
        .map(|Extension(p)| p.query)
        .or_else(|| non_empty(params.q));

    answer(&app_state, text, requester.map(|Extension(r)| r)).await
}

/// Cache counters
pub async fn cache_stats(State(app_state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(app_state.cache.stats())
}

/// Drop every cached query result
pub async fn clear_cache(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = app_state.cache.clear_all().await;
    Json(json!({ "success": cleared }))
}

async fn answer(
    app_state: &AppState,
    text: Option<String>,
    requester: Option<Requester>,
) -> Response {
    let Some(text) = text else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Missing query text" })),
        )
            .into_response();
    };

    match app_state
        .backend
        .answer(&text, requester.as_ref().map(Requester::id))
        .await
    {
        Ok(data) => Json(QueryResponse { success: true, data }).into_response(),
        Err(e) => {
            warn!(error = %e, "Query backend failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}
