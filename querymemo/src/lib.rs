pub mod api;
pub mod backend;

pub use api::{ApiServer, AuthState, JwtAuth, PendingCache, QueryCacheState, Requester};
pub use backend::{CommandBackend, EchoBackend, QueryBackend};
