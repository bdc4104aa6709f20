//! API server for querymemo

use anyhow::Result;
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use querymemo_cache::{start_auto_cleanup, MemoryStore, QueryCache, QueryCacheConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::backend::{EchoBackend, QueryBackend};

use super::middleware::{auth_middleware, AuthState};
use super::query_cache::{query_cache_middleware, QueryCacheState, DEFAULT_MAX_BODY_BYTES};
use super::routes::{cache_stats, clear_cache, health_check, login, query_get, query_post, AppState};

/// Configuration for the API server
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub max_body_bytes: usize,
    pub cache: QueryCacheConfig,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "default_secret_change_in_production".to_string()),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cache: QueryCacheConfig::default(),
        }
    }
}

/// Build the application router
///
/// Query routes run auth first, then the query cache, then the handler.
pub fn build_router(
    app_state: Arc<AppState>,
    auth_state: AuthState,
    max_body_bytes: usize,
) -> Router {
    let cache_state =
        QueryCacheState::new(app_state.cache.clone()).with_max_body_bytes(max_body_bytes);

    let api = Router::new()
        .route("/api/query", get(query_get).post(query_post))
        .route_layer(from_fn_with_state(cache_state, query_cache_middleware))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/cache", delete(clear_cache))
        .route_layer(from_fn_with_state(auth_state.clone(), auth_middleware))
        .with_state(app_state);

    Router::new()
        // Public routes
        .route("/health", get(health_check))
        .route("/login", post(login))
        .with_state(auth_state)
        .merge(api)
        .layer(CorsLayer::permissive())
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    backend: Arc<dyn QueryBackend>,
}

impl ApiServer {
    /// Create a new API server with configuration
    pub fn new(config: ApiServerConfig) -> Self {
        Self {
            config,
            backend: Arc::new(EchoBackend),
        }
    }

    /// Create a new API server with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ApiServerConfig::default())
    }

    /// Replace the query backend
    pub fn with_backend(mut self, backend: Arc<dyn QueryBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Bind the configured address and serve
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        info!("Starting API server on {}", addr);
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.config.cache.validate()?;

        // The server owns the store's lifecycle
        let store = MemoryStore::new();
        tokio::spawn(start_auto_cleanup(store.clone(), self.config.cache.cleanup_interval));

        let namespace = store.namespace(self.config.cache.namespace.clone());
        let cache = Arc::new(QueryCache::new(Arc::new(namespace), self.config.cache.clone()));

        let app_state = Arc::new(AppState {
            cache,
            backend: self.backend,
        });
        let auth_state = AuthState::new(&self.config.jwt_secret);

        let app = build_router(app_state, auth_state, self.config.max_body_bytes);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
