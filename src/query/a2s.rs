// src/query/a2s.rs
//! A2S_INFO client for Rust Legacy game servers.
//!
//! Every failure (resolution, socket, timeout, garbled reply) folds into an
//! offline [`QueryResult`]; callers never see an error.

use async_trait::async_trait;
use byteorder::{LittleEndian, ReadBytesExt};
use chrono::Utc;
use log::debug;
use std::io::{BufRead, Cursor};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use crate::models::server::ServerConfig;
use crate::models::status::QueryResult;
use crate::query::ServerQuery;

const PACKET_PREFIX: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
const A2S_INFO: u8 = 0x54;
const S2C_CHALLENGE: u8 = 0x41;
const S2A_INFO: u8 = 0x49;
const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";
const DEFAULT_SERVER_NAME: &str = "Rust Legacy";
const MAX_PACKET_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("could not resolve {0}")]
    Resolve(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out")]
    Timeout,
    #[error("malformed reply: {0}")]
    Malformed(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoReply {
    pub name: String,
    pub map: String,
    pub game: String,
    pub players: u8,
    pub max_players: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Challenge([u8; 4]),
    Info(InfoReply),
}

/// Builds an A2S_INFO request. A challenge token, when the server asked for
/// one, goes after the payload string.
pub fn info_request(challenge: Option<[u8; 4]>) -> Vec<u8> {
    let mut packet = Vec::with_capacity(PACKET_PREFIX.len() + 1 + INFO_PAYLOAD.len() + 4);
    packet.extend_from_slice(&PACKET_PREFIX);
    packet.push(A2S_INFO);
    packet.extend_from_slice(INFO_PAYLOAD);
    if let Some(token) = challenge {
        packet.extend_from_slice(&token);
    }
    packet
}

pub fn parse_reply(buf: &[u8]) -> Result<Reply, QueryError> {
    if buf.len() < 5 {
        return Err(QueryError::Malformed("short header"));
    }
    if buf[..4] != PACKET_PREFIX {
        return Err(QueryError::Malformed("not a single-packet reply"));
    }

    match buf[4] {
        S2C_CHALLENGE => {
            if buf.len() < 9 {
                return Err(QueryError::Malformed("short challenge"));
            }
            let mut token = [0u8; 4];
            token.copy_from_slice(&buf[5..9]);
            Ok(Reply::Challenge(token))
        }
        S2A_INFO => parse_info(&buf[5..]).map(Reply::Info),
        _ => Err(QueryError::Malformed("unexpected reply type")),
    }
}

// name, map, folder, game, app id (u16 LE), players, max players
fn parse_info(body: &[u8]) -> Result<InfoReply, QueryError> {
    let mut cursor = Cursor::new(body);

    let name = read_cstring(&mut cursor)?;
    let map = read_cstring(&mut cursor)?;
    let _folder = read_cstring(&mut cursor)?;
    let game = read_cstring(&mut cursor)?;

    let _app_id = cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| QueryError::Malformed("missing app id"))?;
    let players = cursor
        .read_u8()
        .map_err(|_| QueryError::Malformed("missing player count"))?;
    let max_players = cursor
        .read_u8()
        .map_err(|_| QueryError::Malformed("missing max players"))?;

    Ok(InfoReply {
        name,
        map,
        game,
        players,
        max_players,
    })
}

fn read_cstring(cursor: &mut Cursor<&[u8]>) -> Result<String, QueryError> {
    let mut raw = Vec::new();
    cursor.read_until(0x00, &mut raw)?;
    if raw.pop() != Some(0x00) {
        return Err(QueryError::Malformed("unterminated string"));
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

#[derive(Debug, Clone)]
pub struct A2sClient {
    timeout: Duration,
}

impl A2sClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn query_address(&self, host: &str, query_port: u16) -> QueryResult {
        let queried_at = Utc::now();

        match self.exchange(host, query_port).await {
            Ok(info) => QueryResult {
                online: true,
                name: if info.name.is_empty() {
                    DEFAULT_SERVER_NAME.to_string()
                } else {
                    info.name
                },
                map: info.map,
                game: info.game,
                players: u32::from(info.players),
                max_players: u32::from(info.max_players),
                queried_at,
            },
            Err(e) => {
                debug!("A2S query to {}:{} failed: {}", host, query_port, e);
                QueryResult::offline(queried_at)
            }
        }
    }

    async fn exchange(&self, host: &str, port: u16) -> Result<InfoReply, QueryError> {
        let addr = self.resolve(host, port).await?;
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(addr).await?;

        let mut buffer = [0u8; MAX_PACKET_SIZE];
        match self.round_trip(&socket, &info_request(None), &mut buffer).await? {
            Reply::Info(info) => Ok(info),
            Reply::Challenge(token) => {
                debug!("{} answered with a challenge, resending", addr);
                match self.round_trip(&socket, &info_request(Some(token)), &mut buffer).await? {
                    Reply::Info(info) => Ok(info),
                    Reply::Challenge(_) => Err(QueryError::Malformed("repeated challenge")),
                }
            }
        }
    }

    async fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, QueryError> {
        let mut addrs = timeout(self.timeout, lookup_host((host, port)))
            .await
            .map_err(|_| QueryError::Timeout)??;
        addrs
            .next()
            .ok_or_else(|| QueryError::Resolve(host.to_string()))
    }

    async fn round_trip(
        &self,
        socket: &UdpSocket,
        request: &[u8],
        buffer: &mut [u8],
    ) -> Result<Reply, QueryError> {
        timeout(self.timeout, socket.send(request))
            .await
            .map_err(|_| QueryError::Timeout)??;
        let len = timeout(self.timeout, socket.recv(buffer))
            .await
            .map_err(|_| QueryError::Timeout)??;
        parse_reply(&buffer[..len])
    }
}

#[async_trait]
impl ServerQuery for A2sClient {
    async fn query(&self, server: &ServerConfig) -> QueryResult {
        self.query_address(&server.ip, server.effective_query_port()).await
    }
}
