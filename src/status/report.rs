// src/status/report.rs
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::server::ServerClass;
use crate::models::status::OnlinePlayer;
use crate::status::history::HistorySampler;

/// Latest push from the in-game plugin for one server class.
#[derive(Debug, Clone, PartialEq)]
pub struct PushReport {
    pub current_players: u32,
    pub players: Vec<OnlinePlayer>,
    pub received_at: DateTime<Utc>,
}

/// Holds the freshest push report per class and hides expired ones.
pub struct ReportIntake {
    reports: RwLock<HashMap<ServerClass, PushReport>>,
    validity: Duration,
    history: Option<Arc<HistorySampler>>,
}

impl ReportIntake {
    pub fn new(validity: Duration) -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
            validity,
            history: None,
        }
    }

    /// Accepted reports are also offered to the sampler as history points.
    pub fn with_history(mut self, sampler: Arc<HistorySampler>) -> Self {
        self.history = Some(sampler);
        self
    }

    pub fn submit(&self, class: ServerClass, current_players: u32, players: Vec<OnlinePlayer>) {
        self.submit_at(class, current_players, players, Utc::now());
    }

    pub fn submit_at(
        &self,
        class: ServerClass,
        current_players: u32,
        players: Vec<OnlinePlayer>,
        now: DateTime<Utc>,
    ) {
        self.reports.write().insert(
            class,
            PushReport {
                current_players,
                players,
                received_at: now,
            },
        );

        if let Some(history) = &self.history {
            history.record_report(class, current_players, now);
        }
    }

    pub fn valid_report_at(&self, class: ServerClass, now: DateTime<Utc>) -> Option<PushReport> {
        let reports = self.reports.read();
        let report = reports.get(&class)?;
        if now - report.received_at > self.validity {
            return None;
        }
        Some(report.clone())
    }

    pub fn valid_count_at(&self, class: ServerClass, now: DateTime<Utc>) -> Option<u32> {
        self.valid_report_at(class, now).map(|r| r.current_players)
    }

    /// The reported player list, only when valid and non-empty.
    pub fn valid_players_at(&self, class: ServerClass, now: DateTime<Utc>) -> Option<Vec<OnlinePlayer>> {
        self.valid_report_at(class, now)
            .map(|r| r.players)
            .filter(|players| !players.is_empty())
    }
}
