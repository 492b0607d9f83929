pub mod a2s;

use async_trait::async_trait;

use crate::models::server::ServerConfig;
use crate::models::status::QueryResult;

pub use a2s::A2sClient;

/// Live status lookup for one configured server.
///
/// Implementations report failures in-band as an offline [`QueryResult`].
#[async_trait]
pub trait ServerQuery: Send + Sync {
    async fn query(&self, server: &ServerConfig) -> QueryResult;
}
