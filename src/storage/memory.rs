// src/storage/memory.rs
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::models::history::HistoryPoint;
use crate::models::server::{sort_for_display, ClassFilter, ServerClass, ServerConfig};
use crate::storage::{select_history, HistoryStore, ServerDirectory, StorageError};

pub struct MemoryStorage {
    servers: DashMap<u32, ServerConfig>,
    history: RwLock<Vec<HistoryPoint>>,
    retention: Duration,
}

impl MemoryStorage {
    pub fn new(retention: Duration) -> Self {
        Self {
            servers: DashMap::new(),
            history: RwLock::new(Vec::new()),
            retention,
        }
    }

    pub fn with_servers(servers: impl IntoIterator<Item = ServerConfig>) -> Self {
        let storage = Self::new(Duration::hours(168));
        for server in servers {
            storage.upsert_server(server);
        }
        storage
    }

    pub fn upsert_server(&self, server: ServerConfig) {
        self.servers.insert(server.id, server);
    }

    pub fn remove_server(&self, id: u32) {
        self.servers.remove(&id);
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    pub fn cleanup_stale_history(&self, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        self.history.write().retain(|p| p.recorded_at >= cutoff);
    }
}

impl ServerDirectory for MemoryStorage {
    fn list_servers(&self, filter: ClassFilter) -> Result<Vec<ServerConfig>, StorageError> {
        let mut servers: Vec<ServerConfig> = self
            .servers
            .iter()
            .filter(|r| filter.matches(r.value().class))
            .map(|r| r.value().clone())
            .collect();
        sort_for_display(&mut servers);
        Ok(servers)
    }
}

impl HistoryStore for MemoryStorage {
    fn append(&self, point: HistoryPoint) -> Result<(), StorageError> {
        let recorded_at = point.recorded_at;
        self.history.write().push(point);
        self.cleanup_stale_history(recorded_at);
        Ok(())
    }

    fn since(
        &self,
        class: Option<ServerClass>,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, StorageError> {
        Ok(select_history(&self.history.read(), class, since))
    }
}
