pub mod file;
pub mod memory;

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::models::history::HistoryPoint;
use crate::models::server::{ClassFilter, ServerClass, ServerConfig};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Source of the configured game servers. Read at the start of every cycle.
pub trait ServerDirectory: Send + Sync {
    /// Servers matching `filter`, ordered by sort order then id.
    fn list_servers(&self, filter: ClassFilter) -> Result<Vec<ServerConfig>, StorageError>;

    fn first_of_class(&self, class: ServerClass) -> Result<Option<ServerConfig>, StorageError> {
        Ok(self
            .list_servers(ClassFilter::Only(class))?
            .into_iter()
            .next())
    }
}

/// Lists servers on the blocking pool. File-backed directories read from
/// disk on every call.
pub async fn list_servers_blocking(
    directory: &Arc<dyn ServerDirectory>,
    filter: ClassFilter,
) -> Result<Vec<ServerConfig>, StorageError> {
    let directory = Arc::clone(directory);
    tokio::task::spawn_blocking(move || directory.list_servers(filter))
        .await
        .map_err(|e| StorageError::Unavailable(format!("server listing task failed: {}", e)))?
}

/// Append-only sink for player-count samples.
pub trait HistoryStore: Send + Sync {
    fn append(&self, point: HistoryPoint) -> Result<(), StorageError>;

    /// Points recorded at or after `since`, oldest first.
    fn since(
        &self,
        class: Option<ServerClass>,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, StorageError>;
}

pub(crate) fn select_history(
    points: &[HistoryPoint],
    class: Option<ServerClass>,
    since: DateTime<Utc>,
) -> Vec<HistoryPoint> {
    let mut selected: Vec<HistoryPoint> = points
        .iter()
        .filter(|p| p.recorded_at >= since)
        .filter(|p| class.map_or(true, |c| p.server_type == c))
        .cloned()
        .collect();
    selected.sort_by_key(|p| p.recorded_at);
    selected
}
