// src/main.rs
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use governor::RateLimiter;
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use legacy_status::config::Config;
use legacy_status::handlers::{self, ReadLimiter, ReportLimiter};
use legacy_status::query::{A2sClient, ServerQuery};
use legacy_status::status::{HistorySampler, ReportIntake, StatusAggregator};
use legacy_status::storage::file::{JsonServerDirectory, JsonlHistoryStore};
use legacy_status::storage::memory::MemoryStorage;
use legacy_status::storage::{HistoryStore, ServerDirectory};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let bind = config.bind();

    let directory: Arc<dyn ServerDirectory> = Arc::new(JsonServerDirectory::new(&config.servers_file));
    let history: Arc<dyn HistoryStore> = match &config.history_file {
        Some(path) => {
            let store = JsonlHistoryStore::open(path, config.history_retention())
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            Arc::new(store)
        }
        None => {
            info!("HISTORY_FILE not set, keeping online history in memory");
            Arc::new(MemoryStorage::new(config.history_retention()))
        }
    };
    let querier: Arc<dyn ServerQuery> = Arc::new(A2sClient::new(config.query_timeout()));

    let sampler = Arc::new(HistorySampler::new(
        directory.clone(),
        history.clone(),
        querier.clone(),
        config.history_min_interval(),
    ));
    let reports = Arc::new(ReportIntake::new(config.report_validity()).with_history(sampler.clone()));
    let aggregator = Arc::new(StatusAggregator::new(directory.clone(), reports.clone(), querier));

    let shutdown = CancellationToken::new();
    info!("Warming status cache from {}", config.servers_file.display());
    let refresh_task = aggregator
        .clone()
        .start(config.refresh_interval(), shutdown.clone())
        .await;
    let history_task = sampler.start(config.history_interval(), shutdown.clone());

    let read_limiter = web::Data::new(ReadLimiter(RateLimiter::keyed(config.status_quota())));
    let report_limiter = web::Data::new(ReportLimiter(RateLimiter::keyed(config.report_quota())));
    let aggregator = web::Data::from(aggregator);
    let reports = web::Data::from(reports);
    let directory = web::Data::from(directory);
    let history = web::Data::from(history);
    let app_config = web::Data::new(config);

    info!("Starting server on {}", bind);
    HttpServer::new(move || {
        App::new()
            .app_data(aggregator.clone())
            .app_data(reports.clone())
            .app_data(directory.clone())
            .app_data(history.clone())
            .app_data(read_limiter.clone())
            .app_data(report_limiter.clone())
            .app_data(app_config.clone())
            .configure(handlers::configure)
    })
        .bind(&bind)?
        .run().await?;

    info!("HTTP server stopped, shutting down background tasks");
    shutdown.cancel();
    let _ = refresh_task.await;
    let _ = history_task.await;
    Ok(())
}
