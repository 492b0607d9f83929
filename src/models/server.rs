// src/models/server.rs
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerClass {
    #[default]
    Classic,
    Deathmatch,
}

impl ServerClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Deathmatch => "deathmatch",
        }
    }
}

impl fmt::Display for ServerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown server type: {0}")]
pub struct UnknownServerClass(pub String);

impl FromStr for ServerClass {
    type Err = UnknownServerClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classic" => Ok(Self::Classic),
            "deathmatch" => Ok(Self::Deathmatch),
            other => Err(UnknownServerClass(other.to_string())),
        }
    }
}

/// Key of a published snapshot: every server, or the servers of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassFilter {
    All,
    Only(ServerClass),
}

impl ClassFilter {
    /// Filters refreshed on every cycle, in refresh order.
    pub const REFRESH_ORDER: [ClassFilter; 3] = [
        ClassFilter::Only(ServerClass::Classic),
        ClassFilter::Only(ServerClass::Deathmatch),
        ClassFilter::All,
    ];

    /// Parses an optional `type` query value. Empty means every server.
    pub fn parse(raw: Option<&str>) -> Result<Self, UnknownServerClass> {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Ok(Self::All),
            Some(other) => other.parse().map(Self::Only),
        }
    }

    pub fn matches(&self, class: ServerClass) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => *wanted == class,
        }
    }
}

impl fmt::Display for ClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(class) => fmt::Display::fmt(class, f),
        }
    }
}

/// A configured game server as stored by the site admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type", default)]
    pub class: ServerClass,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub query_port: Option<i32>,
    #[serde(default)]
    pub max_players: u32,
    #[serde(default)]
    pub sort_order: i32,
}

impl ServerConfig {
    /// The A2S port: the explicit query port when it is a valid port, else
    /// game port + 1.
    pub fn effective_query_port(&self) -> u16 {
        effective_query_port(self.port, self.query_port)
    }
}

fn effective_query_port(game_port: u16, query_port: Option<i32>) -> u16 {
    match query_port {
        Some(p) if p > 0 => u16::try_from(p).unwrap_or_else(|_| {
            warn!("Query port {} is out of range, using game port + 1", p);
            game_port.saturating_add(1)
        }),
        _ => game_port.saturating_add(1),
    }
}

/// Orders servers the way the site lists them.
pub fn sort_for_display(servers: &mut [ServerConfig]) {
    servers.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.id.cmp(&b.id)));
}
