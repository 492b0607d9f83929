// src/models/status.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::server::ServerClass;

/// Outcome of a single A2S exchange. Offline results carry zeroed counts.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub online: bool,
    pub name: String,
    pub map: String,
    pub game: String,
    pub players: u32,
    pub max_players: u32,
    pub queried_at: DateTime<Utc>,
}

impl QueryResult {
    pub fn offline(queried_at: DateTime<Utc>) -> Self {
        Self {
            online: false,
            name: String::new(),
            map: String::new(),
            game: String::new(),
            players: 0,
            max_players: 0,
            queried_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlinePlayer {
    pub steam_id: String,
    pub username: String,
}

/// One entry of a published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub server_id: u32,
    pub server_name: String,
    pub server_type: ServerClass,
    pub is_online: bool,
    pub current_players: u32,
    pub max_players: u32,
    pub map: String,
    /// Seconds of the current uninterrupted online streak.
    pub uptime: i64,
    pub ip: String,
    pub port: u16,
    pub active_players: Vec<OnlinePlayer>,
}
