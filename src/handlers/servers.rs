// src/handlers/servers.rs
use actix_web::{web, HttpRequest, HttpResponse};

use crate::config::Config;
use crate::handlers::ReadLimiter;
use crate::models::server::ClassFilter;
use crate::storage::ServerDirectory;
use crate::utils::{check_rate_limit, RequestError};

pub async fn get_servers(
    req: HttpRequest,
    directory: web::Data<dyn ServerDirectory>,
    rate_limiter: web::Data<ReadLimiter>,
    config: web::Data<Config>,
) -> Result<HttpResponse, RequestError> {
    check_rate_limit(&req, &rate_limiter.0, config.trust_proxy_headers, "server list")?;
    let servers = directory.list_servers(ClassFilter::All)?;
    Ok(HttpResponse::Ok().json(servers))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use crate::handlers::testing::{app_config, peer, TestState};
    use crate::models::server::{ServerClass, ServerConfig};
    use crate::status::testing::server;

    #[actix_web::test]
    async fn lists_servers_in_display_order() {
        let mut second = server(2, ServerClass::Deathmatch);
        second.sort_order = -1;
        let state = TestState::new(vec![server(1, ServerClass::Classic), second]);
        let app = test::init_service(App::new().configure(app_config(&state))).await;

        let req = test::TestRequest::get()
            .uri("/api/servers")
            .peer_addr(peer())
            .to_request();
        let body: Vec<ServerConfig> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<u32> = body.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
