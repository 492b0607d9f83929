pub mod history;
pub mod index;
pub mod report;
pub mod servers;
pub mod status;

use actix_web::web;

use crate::utils::IpRateLimiter;

/// Per-IP limiter shared by the read endpoints.
pub struct ReadLimiter(pub IpRateLimiter);

/// Per-IP limiter for plugin report submissions.
pub struct ReportLimiter(pub IpRateLimiter);

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index::index)).service(
        web::scope("/api")
            .route("/server-status", web::get().to(status::get_status))
            .route("/server-status/classic", web::get().to(status::get_classic_status))
            .route("/server-status/deathmatch", web::get().to(status::get_deathmatch_status))
            .route("/server-status/report", web::post().to(report::handle_report))
            .route("/server-status/history", web::get().to(history::get_history))
            .route("/servers", web::get().to(servers::get_servers)),
    );
}
