// src/status/history.rs
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::history::HistoryPoint;
use crate::models::server::{ClassFilter, ServerClass};
use crate::query::ServerQuery;
use crate::status::query_all;
use crate::storage::{list_servers_blocking, HistoryStore, ServerDirectory};

/// Writes player-count samples for the online chart.
///
/// Two paths feed the store: a slow periodic poll of every server, and push
/// reports, which are throttled per class by `min_interval`.
pub struct HistorySampler {
    directory: Arc<dyn ServerDirectory>,
    store: Arc<dyn HistoryStore>,
    querier: Arc<dyn ServerQuery>,
    min_interval: Duration,
    last_write: Mutex<HashMap<ServerClass, DateTime<Utc>>>,
}

impl HistorySampler {
    pub fn new(
        directory: Arc<dyn ServerDirectory>,
        store: Arc<dyn HistoryStore>,
        querier: Arc<dyn ServerQuery>,
        min_interval: Duration,
    ) -> Self {
        Self {
            directory,
            store,
            querier,
            min_interval,
            last_write: Mutex::new(HashMap::new()),
        }
    }

    /// Records a pushed player count against the first server of `class`.
    /// Returns whether a point was written.
    pub fn record_report(&self, class: ServerClass, players: u32, at: DateTime<Utc>) -> bool {
        {
            let mut last_write = self.last_write.lock();
            if let Some(previous) = last_write.get(&class) {
                if at - *previous < self.min_interval {
                    return false;
                }
            }
            last_write.insert(class, at);
        }

        let server = match self.directory.first_of_class(class) {
            Ok(Some(server)) => server,
            Ok(None) => {
                debug!("No {} server configured, report not recorded", class);
                return false;
            }
            Err(e) => {
                warn!("Could not look up {} server for history: {}", class, e);
                return false;
            }
        };

        let point = HistoryPoint {
            server_id: server.id,
            server_type: class,
            players,
            recorded_at: at,
        };
        match self.store.append(point) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save {} history point: {}", class, e);
                false
            }
        }
    }

    /// Polls every configured server and stores one point each. Returns the
    /// number of points written.
    pub async fn collect(&self) -> usize {
        let servers = match list_servers_blocking(&self.directory, ClassFilter::All).await {
            Ok(servers) => servers,
            Err(e) => {
                warn!("Skipping history collection, server list unavailable: {}", e);
                return 0;
            }
        };

        let results = query_all(&self.querier, &servers).await;
        let recorded_at = Utc::now();
        let points: Vec<HistoryPoint> = servers
            .iter()
            .zip(results)
            .map(|(server, result)| HistoryPoint {
                server_id: server.id,
                server_type: server.class,
                players: result.players,
                recorded_at,
            })
            .collect();

        let store = Arc::clone(&self.store);
        let appended = tokio::task::spawn_blocking(move || {
            let mut written = 0;
            for point in points {
                let server_id = point.server_id;
                match store.append(point) {
                    Ok(()) => written += 1,
                    Err(e) => error!("Failed to save history point for server {}: {}", server_id, e),
                }
            }
            written
        })
        .await;

        match appended {
            Ok(written) => written,
            Err(e) => {
                error!("History write task failed: {}", e);
                0
            }
        }
    }

    /// Collects immediately, then every `period` until `shutdown` is cancelled.
    pub fn start(self: Arc<Self>, period: std::time::Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("History sampler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let written = self.collect().await;
                        debug!("History collection wrote {} points", written);
                    }
                }
            }
        })
    }
}
