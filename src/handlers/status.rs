// src/handlers/status.rs
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::config::Config;
use crate::handlers::ReadLimiter;
use crate::models::server::{ClassFilter, ServerClass};
use crate::status::StatusAggregator;
use crate::utils::{check_rate_limit, RequestError};

#[derive(Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "type")]
    server_type: Option<String>,
}

pub async fn get_status(
    req: HttpRequest,
    aggregator: web::Data<StatusAggregator>,
    rate_limiter: web::Data<ReadLimiter>,
    config: web::Data<Config>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse, RequestError> {
    check_rate_limit(&req, &rate_limiter.0, config.trust_proxy_headers, "server status")?;
    let filter = ClassFilter::parse(query.server_type.as_deref())?;
    Ok(snapshot_response(&aggregator, filter))
}

pub async fn get_classic_status(
    req: HttpRequest,
    aggregator: web::Data<StatusAggregator>,
    rate_limiter: web::Data<ReadLimiter>,
    config: web::Data<Config>,
) -> Result<HttpResponse, RequestError> {
    check_rate_limit(&req, &rate_limiter.0, config.trust_proxy_headers, "server status")?;
    Ok(snapshot_response(&aggregator, ClassFilter::Only(ServerClass::Classic)))
}

pub async fn get_deathmatch_status(
    req: HttpRequest,
    aggregator: web::Data<StatusAggregator>,
    rate_limiter: web::Data<ReadLimiter>,
    config: web::Data<Config>,
) -> Result<HttpResponse, RequestError> {
    check_rate_limit(&req, &rate_limiter.0, config.trust_proxy_headers, "server status")?;
    Ok(snapshot_response(&aggregator, ClassFilter::Only(ServerClass::Deathmatch)))
}

fn snapshot_response(aggregator: &StatusAggregator, filter: ClassFilter) -> HttpResponse {
    let snapshot = aggregator.snapshot(filter);
    HttpResponse::Ok().json(&*snapshot)
}
