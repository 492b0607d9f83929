use actix_web::{test, web, App};
use chrono::Duration as ChronoDuration;
use governor::{Quota, RateLimiter};
use std::fs;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use legacy_status::config::Config;
use legacy_status::handlers::{self, ReadLimiter, ReportLimiter};
use legacy_status::models::history::HistoryPoint;
use legacy_status::models::server::{ClassFilter, ServerClass};
use legacy_status::models::status::ServerStatus;
use legacy_status::query::{A2sClient, ServerQuery};
use legacy_status::status::{HistorySampler, ReportIntake, StatusAggregator};
use legacy_status::storage::file::JsonServerDirectory;
use legacy_status::storage::memory::MemoryStorage;
use legacy_status::storage::{HistoryStore, ServerDirectory};

fn make_temp_dir(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let uniq = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("unix epoch")
        .as_nanos();
    path.push(format!("legacy-status-e2e-{name}-{uniq}"));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

fn info_reply(map: &str, players: u8, max_players: u8) -> Vec<u8> {
    let mut packet = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x49];
    for field in ["Legacy E2E", map, "rust", "Rust Legacy"] {
        packet.extend_from_slice(field.as_bytes());
        packet.push(0x00);
    }
    packet.extend_from_slice(&[0x00, 0x00]);
    packet.push(players);
    packet.push(max_players);
    packet
}

/// Answers every datagram with the same A2S_INFO reply. With a challenge, only
/// the plain request followed by the random token gets the reply.
async fn spawn_game_server(reply: Vec<u8>, with_challenge: bool) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind responder");
    let addr = socket.local_addr().expect("responder addr");
    let token: [u8; 4] = rand::random();

    let mut challenged = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x54];
    challenged.extend_from_slice(b"Source Engine Query\0");
    challenged.extend_from_slice(&token);

    tokio::spawn(async move {
        let mut buf = [0u8; 1500];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let answered_challenge = buf[..len] == challenged[..];
            let answer = if with_challenge && !answered_challenge {
                let mut packet = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x41];
                packet.extend_from_slice(&token);
                packet
            } else {
                reply.clone()
            };
            let _ = socket.send_to(&answer, peer).await;
        }
    });
    addr
}

fn write_servers(dir: &Path, query_port: u16) -> PathBuf {
    let path = dir.join("servers.json");
    let servers = serde_json::json!([
        {
            "id": 1,
            "name": "Classic",
            "type": "classic",
            "ip": "127.0.0.1",
            "port": 28015,
            "queryPort": query_port,
            "maxPlayers": 100,
            "sortOrder": 0
        }
    ]);
    fs::write(&path, serde_json::to_vec(&servers).expect("encode")).expect("write servers");
    path
}

struct Service {
    aggregator: Arc<StatusAggregator>,
    reports: Arc<ReportIntake>,
    sampler: Arc<HistorySampler>,
    directory: Arc<dyn ServerDirectory>,
    history: Arc<MemoryStorage>,
}

fn build_service(servers_file: PathBuf) -> Service {
    let directory: Arc<dyn ServerDirectory> = Arc::new(JsonServerDirectory::new(servers_file));
    let history = Arc::new(MemoryStorage::new(ChronoDuration::hours(168)));
    let querier: Arc<dyn ServerQuery> = Arc::new(A2sClient::new(Duration::from_secs(2)));
    let sampler = Arc::new(HistorySampler::new(
        directory.clone(),
        history.clone(),
        querier.clone(),
        ChronoDuration::minutes(2),
    ));
    let reports = Arc::new(ReportIntake::new(ChronoDuration::seconds(120)).with_history(sampler.clone()));
    let aggregator = Arc::new(StatusAggregator::new(directory.clone(), reports.clone(), querier));
    Service {
        aggregator,
        reports,
        sampler,
        directory,
        history,
    }
}

fn app_config(service: &Service) -> impl FnOnce(&mut web::ServiceConfig) {
    let aggregator = service.aggregator.clone();
    let reports = service.reports.clone();
    let directory = service.directory.clone();
    let history: Arc<dyn HistoryStore> = service.history.clone();
    let quota = Quota::per_second(NonZeroU32::new(1000).expect("non-zero"));

    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::from(aggregator))
            .app_data(web::Data::from(reports))
            .app_data(web::Data::from(directory))
            .app_data(web::Data::from(history))
            .app_data(web::Data::new(ReadLimiter(RateLimiter::keyed(quota))))
            .app_data(web::Data::new(ReportLimiter(RateLimiter::keyed(quota))))
            .app_data(web::Data::new(Config::default()));
        handlers::configure(cfg);
    }
}

fn client() -> SocketAddr {
    "127.0.0.1:45000".parse().expect("client addr")
}

#[actix_web::test]
async fn live_server_shows_up_in_classic_snapshot() {
    let game = spawn_game_server(info_reply("ProceduralMap", 7, 100), false).await;
    let dir = make_temp_dir("snapshot");
    let service = build_service(write_servers(&dir, game.port()));

    service.aggregator.refresh_all().await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    service.aggregator.refresh_all().await;

    let app = test::init_service(App::new().configure(app_config(&service))).await;
    let req = test::TestRequest::get()
        .uri("/api/server-status/classic")
        .peer_addr(client())
        .to_request();
    let body: Vec<ServerStatus> = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.len(), 1);
    let status = &body[0];
    assert!(status.is_online);
    assert_eq!(status.current_players, 7);
    assert_eq!(status.max_players, 100);
    assert_eq!(status.map, "ProceduralMap");
    assert_eq!(status.server_type, ServerClass::Classic);
    assert!(status.uptime > 0);

    let req = test::TestRequest::get()
        .uri("/api/server-status/deathmatch")
        .peer_addr(client())
        .to_request();
    let body: Vec<ServerStatus> = test::call_and_read_body_json(&app, req).await;
    assert!(body.is_empty());

    let _ = fs::remove_dir_all(dir);
}

#[actix_web::test]
async fn challenge_server_and_push_report_flow() {
    let game = spawn_game_server(info_reply("rust_island_2013", 2, 50), true).await;
    let dir = make_temp_dir("push");
    let service = build_service(write_servers(&dir, game.port()));
    let shutdown = CancellationToken::new();
    let refresh = service
        .aggregator
        .clone()
        .start(Duration::from_secs(3600), shutdown.clone())
        .await;

    let snapshot = service.aggregator.snapshot(ClassFilter::All);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].current_players, 2);
    assert_eq!(snapshot[0].map, "rust_island_2013");

    let app = test::init_service(App::new().configure(app_config(&service))).await;
    let req = test::TestRequest::post()
        .uri("/api/server-status/report")
        .peer_addr(client())
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"{"classic":{"currentPlayers":5,"players":[{"steamId":"76561198000000001","username":"Hank"}]}}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    service.aggregator.refresh(ClassFilter::All).await;
    let snapshot = service.aggregator.snapshot(ClassFilter::All);
    assert_eq!(snapshot[0].current_players, 5);
    assert_eq!(snapshot[0].active_players.len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/server-status/history?type=classic&hours=1")
        .peer_addr(client())
        .to_request();
    let points: Vec<HistoryPoint> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].players, 5);

    // the periodic path queries the game server itself
    assert_eq!(service.sampler.collect().await, 1);
    assert_eq!(service.history.history_len(), 2);

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), refresh)
        .await
        .expect("refresh task did not stop")
        .expect("refresh task panicked");

    let _ = fs::remove_dir_all(dir);
}

#[actix_web::test]
async fn unreachable_server_is_reported_offline() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.expect("bind silent");
    let dir = make_temp_dir("offline");
    let service = build_service(write_servers(&dir, silent.local_addr().expect("addr").port()));

    service.aggregator.refresh(ClassFilter::Only(ServerClass::Classic)).await;

    let snapshot = service.aggregator.snapshot(ClassFilter::Only(ServerClass::Classic));
    assert_eq!(snapshot.len(), 1);
    assert!(!snapshot[0].is_online);
    assert_eq!(snapshot[0].current_players, 0);
    assert_eq!(snapshot[0].uptime, 0);
    assert_eq!(snapshot[0].map, "Unknown");

    drop(silent);
    let _ = fs::remove_dir_all(dir);
}
