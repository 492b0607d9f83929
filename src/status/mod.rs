pub mod aggregator;
pub mod history;
pub mod report;

use chrono::Utc;
use log::warn;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::models::server::ServerConfig;
use crate::models::status::QueryResult;
use crate::query::ServerQuery;

pub use aggregator::StatusAggregator;
pub use history::HistorySampler;
pub use report::{PushReport, ReportIntake};

/// Queries every server concurrently and returns the results in the order of
/// `servers`. A query task that dies counts as an offline result.
pub async fn query_all(querier: &Arc<dyn ServerQuery>, servers: &[ServerConfig]) -> Vec<QueryResult> {
    let mut tasks = JoinSet::new();
    for (index, server) in servers.iter().cloned().enumerate() {
        let querier = Arc::clone(querier);
        tasks.spawn(async move { (index, querier.query(&server).await) });
    }

    let mut results = vec![QueryResult::offline(Utc::now()); servers.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = result,
            Err(e) => warn!("Status query task failed: {}", e),
        }
    }
    results
}
