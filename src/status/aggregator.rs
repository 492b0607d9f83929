// src/status/aggregator.rs
//! Published view of every configured server.
//!
//! Each cycle lists the servers per filter, queries them all at once, folds
//! in push reports and swaps the filter's snapshot in one assignment. Reads
//! only ever touch the cache.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::server::{ClassFilter, ServerConfig};
use crate::models::status::{QueryResult, ServerStatus};
use crate::query::ServerQuery;
use crate::status::query_all;
use crate::status::report::ReportIntake;
use crate::storage::{list_servers_blocking, ServerDirectory};

const UNKNOWN_MAP: &str = "Unknown";

pub struct StatusAggregator {
    directory: Arc<dyn ServerDirectory>,
    reports: Arc<ReportIntake>,
    querier: Arc<dyn ServerQuery>,
    cache: RwLock<HashMap<ClassFilter, Arc<[ServerStatus]>>>,
    // server id -> first time seen online in the current streak
    uptime: Mutex<HashMap<u32, DateTime<Utc>>>,
}

impl StatusAggregator {
    pub fn new(
        directory: Arc<dyn ServerDirectory>,
        reports: Arc<ReportIntake>,
        querier: Arc<dyn ServerQuery>,
    ) -> Self {
        Self {
            directory,
            reports,
            querier,
            cache: RwLock::new(HashMap::new()),
            uptime: Mutex::new(HashMap::new()),
        }
    }

    /// Current snapshot for `filter`; empty until the first successful refresh.
    pub fn snapshot(&self, filter: ClassFilter) -> Arc<[ServerStatus]> {
        self.cache
            .read()
            .get(&filter)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub async fn refresh_all(&self) {
        for filter in ClassFilter::REFRESH_ORDER {
            self.refresh(filter).await;
        }
    }

    /// Rebuilds one snapshot. Returns false when the server list could not be
    /// read, in which case the previous snapshot stays published.
    pub async fn refresh(&self, filter: ClassFilter) -> bool {
        self.refresh_at(filter, Utc::now()).await
    }

    pub async fn refresh_at(&self, filter: ClassFilter, now: DateTime<Utc>) -> bool {
        let Some((servers, results)) = self.poll(filter).await else {
            return false;
        };
        self.publish(filter, &servers, results, now);
        true
    }

    /// Runs one refresh, then keeps refreshing every `period` on a background
    /// task until `shutdown` is cancelled.
    pub async fn start(self: Arc<Self>, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        self.refresh_all().await;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Status refresh stopped");
                        break;
                    }
                    _ = ticker.tick() => self.refresh_all().await,
                }
            }
        })
    }

    async fn poll(&self, filter: ClassFilter) -> Option<(Vec<ServerConfig>, Vec<QueryResult>)> {
        let servers = match list_servers_blocking(&self.directory, filter).await {
            Ok(servers) => servers,
            Err(e) => {
                warn!("Skipping {} status refresh, server list unavailable: {}", filter, e);
                return None;
            }
        };
        let results = query_all(&self.querier, &servers).await;
        Some((servers, results))
    }

    fn publish(
        &self,
        filter: ClassFilter,
        servers: &[ServerConfig],
        results: Vec<QueryResult>,
        now: DateTime<Utc>,
    ) {
        let statuses: Vec<ServerStatus> = servers
            .iter()
            .zip(results)
            .map(|(server, query)| self.merge(server, query, now))
            .collect();

        debug!(
            "Published {} status: {} servers, {} online",
            filter,
            statuses.len(),
            statuses.iter().filter(|s| s.is_online).count()
        );

        let snapshot: Arc<[ServerStatus]> = statuses.into();
        self.cache.write().insert(filter, snapshot);
    }

    fn merge(&self, server: &ServerConfig, query: QueryResult, now: DateTime<Utc>) -> ServerStatus {
        let current_players = self
            .reports
            .valid_count_at(server.class, now)
            .unwrap_or(query.players);
        let active_players = self
            .reports
            .valid_players_at(server.class, now)
            .unwrap_or_default();
        let max_players = if query.max_players > 0 {
            query.max_players
        } else {
            server.max_players
        };
        // A valid push report keeps the server online even when UDP fails.
        let is_online = query.online || current_players > 0;
        let uptime = self.track_uptime(server.id, is_online, now);

        ServerStatus {
            server_id: server.id,
            server_name: server.name.clone(),
            server_type: server.class,
            is_online,
            current_players,
            max_players,
            map: if query.map.is_empty() {
                UNKNOWN_MAP.to_string()
            } else {
                query.map
            },
            uptime,
            ip: server.ip.clone(),
            port: server.port,
            active_players,
        }
    }

    fn track_uptime(&self, server_id: u32, online: bool, now: DateTime<Utc>) -> i64 {
        let mut anchors = self.uptime.lock();
        if !online {
            anchors.remove(&server_id);
            return 0;
        }
        let first_seen = *anchors.entry(server_id).or_insert(now);
        (now - first_seen).num_seconds().max(0)
    }
}
