//! API module for the querymemo HTTP server

pub mod auth;
pub mod middleware;
pub mod query_cache;
pub mod routes;
pub mod server;

pub use auth::{JwtAuth, Requester};
pub use middleware::AuthState;
pub use query_cache::{query_cache_middleware, PendingCache, QueryCacheState};
pub use server::ApiServer;
