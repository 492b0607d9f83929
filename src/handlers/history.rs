// src/handlers/history.rs
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::config::Config;
use crate::handlers::ReadLimiter;
use crate::models::server::ClassFilter;
use crate::storage::HistoryStore;
use crate::utils::{check_rate_limit, RequestError};

const DEFAULT_HOURS: i64 = 24;
const MAX_HOURS: i64 = 168;

#[derive(Deserialize)]
pub struct HistoryQuery {
    hours: Option<String>,
    #[serde(rename = "type")]
    server_type: Option<String>,
}

/// Window length in hours; anything unparsable or outside 1..=168 means 24.
pub fn history_window(raw: Option<&str>) -> i64 {
    raw.and_then(|h| h.trim().parse::<i64>().ok())
        .filter(|h| (1..=MAX_HOURS).contains(h))
        .unwrap_or(DEFAULT_HOURS)
}

pub async fn get_history(
    req: HttpRequest,
    store: web::Data<dyn HistoryStore>,
    rate_limiter: web::Data<ReadLimiter>,
    config: web::Data<Config>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, RequestError> {
    check_rate_limit(&req, &rate_limiter.0, config.trust_proxy_headers, "history")?;

    let hours = history_window(query.hours.as_deref());
    let class = match ClassFilter::parse(query.server_type.as_deref())? {
        ClassFilter::All => None,
        ClassFilter::Only(class) => Some(class),
    };

    let points = store.since(class, Utc::now() - Duration::hours(hours))?;
    Ok(HttpResponse::Ok().json(points))
}
