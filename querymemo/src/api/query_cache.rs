//! Query cache interceptor for Axum
//!
//! Wraps a query handler with two hooks:
//!
//! 1. [`on_request`]: find the query text (`message`, then `query` in a JSON
//!    body, then the `q` query-string parameter) and the requester scope, then
//!    consult the cache. A hit is answered directly and the handler never runs.
//! 2. [`on_response`]: after a miss, if the handler answered with a 2xx JSON
//!    body carrying `data`, write it back in a detached task.
//!
//! Requests without query text bypass the cache entirely, and so do requests
//! whose body is larger than the inspection limit or fails to read. Handler
//! responses, errors included, pass through untouched.
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware, routing::post, Router};
//! use querymemo::api::query_cache::{query_cache_middleware, QueryCacheState};
//!
//! let app = Router::new()
//!     .route("/api/query", post(run_query))
//!     .layer(middleware::from_fn_with_state(
//!         QueryCacheState::new(cache),
//!         query_cache_middleware,
//!     ));
//! ```

use axum::{
    body::{Body, BodyDataStream, Bytes},
    extract::{Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use querymemo_cache::{QueryCache, QueryCacheEntry};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::auth::Requester;

/// Response header reporting the cache outcome (`hit` or `miss`)
pub const CACHE_STATUS_HEADER: &str = "x-query-cache";

/// Largest request body inspected for query text (1MB); bigger bodies bypass
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Body fields searched for query text, in priority order
const BODY_QUERY_FIELDS: [&str; 2] = ["message", "query"];

/// Query-string parameter searched after the body fields
const QUERY_PARAM: &str = "q";

/// Response body field holding the cacheable payload
const PAYLOAD_FIELD: &str = "data";

/// Shared state for the interceptor
#[derive(Clone)]
pub struct QueryCacheState {
    pub cache: Arc<QueryCache>,
    pub max_body_bytes: usize,
}

impl QueryCacheState {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self {
            cache,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Identity of a missed request, carried to the response hook
///
/// Also inserted into request extensions so handlers can read the query
/// text the cache resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCache {
    pub query: String,
    pub scope: String,
}

/// Outcome of the request hook
#[derive(Debug)]
pub enum RequestOutcome {
    /// No query text; the cache takes no part in this request
    Bypass,
    /// Answer with the cached entry, skipping the handler
    ServedFromCache(QueryCacheEntry),
    /// Run the handler and cache its answer
    AwaitingResponse(PendingCache),
}

/// A body read into memory, or handed back intact when it could not be
enum Buffered {
    Complete(Bytes),
    /// Over the limit or failed mid-read; replays what was read, then the rest
    Passthrough(Body),
}

/// Body of a response served from the cache
#[derive(Debug, Serialize)]
struct CachedAnswer {
    success: bool,
    data: Value,
    cached: bool,
    cached_at: DateTime<Utc>,
}

/// Axum middleware caching query answers by (requester, query text)
pub async fn query_cache_middleware(
    State(state): State<QueryCacheState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > state.max_body_bytes) {
        debug!("Request body over inspection limit, bypassing query cache");
        return next.run(Request::from_parts(parts, body)).await;
    }

    let body = match buffer_body(body, state.max_body_bytes).await {
        Buffered::Complete(bytes) => bytes,
        Buffered::Passthrough(body) => {
            debug!("Request body not inspected, bypassing query cache");
            return next.run(Request::from_parts(parts, body)).await;
        }
    };

    let scope = parts
        .extensions
        .get::<Requester>()
        .map(|r| r.id().to_string())
        .unwrap_or_default();

    let outcome = on_request(&state.cache, &body, &parts.uri, scope).await;
    let mut request = Request::from_parts(parts, Body::from(body));

    match outcome {
        RequestOutcome::Bypass => next.run(request).await,
        RequestOutcome::ServedFromCache(entry) => cached_response(entry),
        RequestOutcome::AwaitingResponse(pending) => {
            request.extensions_mut().insert(pending.clone());
            let response = next.run(request).await;
            on_response(state.cache.clone(), pending, response).await
        }
    }
}

/// Request hook: resolve identity and consult the cache
pub async fn on_request(
    cache: &QueryCache,
    body: &[u8],
    uri: &Uri,
    scope: String,
) -> RequestOutcome {
    let Some(query) = extract_query_text(body, uri) else {
        return RequestOutcome::Bypass;
    };

    match cache.get(&query, &scope).await {
        Some(entry) => RequestOutcome::ServedFromCache(entry),
        None => RequestOutcome::AwaitingResponse(PendingCache { query, scope }),
    }
}

/// Response hook: schedule a cache write for a qualifying answer
///
/// The write runs on its own task; the response is returned without waiting
/// for it. The requester receives the handler's status, headers and body
/// as produced, plus the cache status header.
pub async fn on_response(
    cache: Arc<QueryCache>,
    pending: PendingCache,
    response: Response,
) -> Response {
    if !response.status().is_success() || !is_json(&response) {
        return with_cache_status(response, "miss");
    }

    let (mut parts, body) = response.into_parts();
    let body = match buffer_body(body, usize::MAX).await {
        Buffered::Complete(bytes) => bytes,
        Buffered::Passthrough(body) => {
            return with_cache_status(Response::from_parts(parts, body), "miss");
        }
    };

    if let Some(payload) = cacheable_payload(parts.status, &body) {
        tokio::spawn(async move {
            cache.set(&pending.query, payload, &pending.scope, None).await;
        });
    } else {
        debug!("Handler response carries no cacheable payload");
    }

    parts
        .headers
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("miss"));
    Response::from_parts(parts, Body::from(body))
}

/// First non-empty query text: body `message`, body `query`, then `?q=`
pub fn extract_query_text(body: &[u8], uri: &Uri) -> Option<String> {
    let from_body = serde_json::from_slice::<Value>(body).ok().and_then(|json| {
        BODY_QUERY_FIELDS
            .iter()
            .filter_map(|field| json.get(*field).and_then(Value::as_str))
            .find(|text| !text.trim().is_empty())
            .map(str::to_string)
    });

    from_body.or_else(|| {
        Query::<HashMap<String, String>>::try_from_uri(uri)
            .ok()
            .and_then(|Query(mut params)| params.remove(QUERY_PARAM))
            .filter(|text| !text.trim().is_empty())
    })
}

/// The `data` field of a successful JSON answer
pub fn cacheable_payload(status: StatusCode, body: &Bytes) -> Option<Value> {
    if !status.is_success() {
        return None;
    }

    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Object(mut map) => map.remove(PAYLOAD_FIELD),
        _ => None,
    }
}

/// Read a body up to `limit` bytes without losing it on overflow or error
async fn buffer_body(body: Body, limit: usize) -> Buffered {
    let mut frames = body.into_data_stream();
    let mut chunks = Vec::new();
    let mut len = 0usize;

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(chunk) => {
                len = len.saturating_add(chunk.len());
                chunks.push(chunk);
                if len > limit {
                    return Buffered::Passthrough(replay(chunks, None, frames));
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read body");
                return Buffered::Passthrough(replay(chunks, Some(e), frames));
            }
        }
    }

    Buffered::Complete(Bytes::from(chunks.concat()))
}

fn replay(chunks: Vec<Bytes>, error: Option<axum::Error>, rest: BodyDataStream) -> Body {
    let read = stream::iter(chunks.into_iter().map(Ok::<Bytes, axum::Error>).chain(error.map(Err)));
    Body::from_stream(read.chain(rest))
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn cached_response(entry: QueryCacheEntry) -> Response {
    let answer = CachedAnswer {
        success: true,
        data: entry.result,
        cached: true,
        cached_at: entry.timestamp,
    };
    with_cache_status(Json(answer).into_response(), "hit")
}

fn with_cache_status(mut response: Response, status: &'static str) -> Response {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}
