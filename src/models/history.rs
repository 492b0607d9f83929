// src/models/history.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::server::ServerClass;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub server_id: u32,
    pub server_type: ServerClass,
    pub players: u32,
    pub recorded_at: DateTime<Utc>,
}
