// src/utils.rs
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::RateLimiter;
use log::{debug, error};
use std::net::IpAddr;
use thiserror::Error;

use crate::models::server::UnknownServerClass;
use crate::storage::StorageError;

pub type IpRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Failed to extract client IP")]
    MissingPeerIP,
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("{0}")]
    UnknownServerClass(#[from] UnknownServerClass),
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("Worker pool unavailable")]
    Blocking(#[from] BlockingError),
}

impl ResponseError for RequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Storage(_) | Self::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).body(self.to_string())
    }
}

/// Client address for rate limiting. Forwarding headers are only honoured
/// when the service sits behind a trusted reverse proxy.
pub fn extract_client_ip(req: &HttpRequest, trust_proxy_headers: bool) -> Result<IpAddr, RequestError> {
    if trust_proxy_headers {
        if let Some(ip) = header_ip(req, "X-Forwarded-For") {
            return Ok(ip);
        }
        if let Some(ip) = header_ip(req, "X-Real-IP") {
            debug!("Using provided X-Real-IP: {}", ip);
            return Ok(ip);
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip())
        .ok_or(RequestError::MissingPeerIP)
}

// First address of a comma-separated header value.
fn header_ip(req: &HttpRequest, name: &str) -> Option<IpAddr> {
    req.headers()
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

pub fn check_rate_limit(
    req: &HttpRequest,
    limiter: &IpRateLimiter,
    trust_proxy_headers: bool,
    route: &str,
) -> Result<(), RequestError> {
    let ip = extract_client_ip(req, trust_proxy_headers)?;
    if limiter.check_key(&ip).is_err() {
        error!("Rate limit exceeded for {} for ip: {}", route, ip);
        return Err(RequestError::RateLimitExceeded);
    }
    Ok(())
}
