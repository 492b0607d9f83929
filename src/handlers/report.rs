// src/handlers/report.rs
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error};
use serde::Deserialize;

use crate::config::Config;
use crate::handlers::ReportLimiter;
use crate::models::server::ServerClass;
use crate::models::status::OnlinePlayer;
use crate::status::ReportIntake;
use crate::utils::{check_rate_limit, RequestError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReport {
    pub current_players: u32,
    #[serde(default)]
    pub players: Vec<OnlinePlayer>,
}

/// Body posted by the in-game plugin. Either class may be absent.
#[derive(Debug, Default, Deserialize)]
pub struct ReportPayload {
    #[serde(default)]
    pub classic: Option<ClassReport>,
    #[serde(default)]
    pub deathmatch: Option<ClassReport>,
}

impl ReportPayload {
    pub fn into_reports(self) -> impl Iterator<Item = (ServerClass, ClassReport)> {
        [
            (ServerClass::Classic, self.classic),
            (ServerClass::Deathmatch, self.deathmatch),
        ]
        .into_iter()
        .filter_map(|(class, report)| report.map(|r| (class, r)))
    }
}

pub async fn handle_report(
    req: HttpRequest,
    reports: web::Data<ReportIntake>,
    rate_limiter: web::Data<ReportLimiter>,
    config: web::Data<Config>,
    bytes: web::Bytes,
) -> Result<HttpResponse, RequestError> {
    check_rate_limit(&req, &rate_limiter.0, config.trust_proxy_headers, "status report")?;

    let payload: ReportPayload = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to parse status report: {}", e);
            return Ok(HttpResponse::BadRequest().body(format!("Invalid report: {}", e)));
        }
    };

    // Accepted reports may be appended to a history file.
    let reports = reports.into_inner();
    web::block(move || {
        for (class, report) in payload.into_reports() {
            debug!(
                "Report for {}: {} players ({} named)",
                class,
                report.current_players,
                report.players.len()
            );
            reports.submit(class, report.current_players, report.players);
        }
    })
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": "true" })))
}
