use governor::Quota;
use std::env;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // HTTP
    pub bind_address: String,
    pub port: u16,
    pub trust_proxy_headers: bool,

    // Rate limiting configs
    pub status_period_secs: u64,
    pub status_burst_limit: u32,
    pub report_period_secs: u64,
    pub report_burst_limit: u32,

    // Storage
    pub servers_file: PathBuf,
    pub history_file: Option<PathBuf>,
    pub history_retention_hours: i64,

    // Status pipeline
    pub status_refresh_secs: u64,
    pub history_sample_secs: u64,
    pub history_min_interval_secs: i64,
    pub report_valid_secs: i64,
    pub query_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            trust_proxy_headers: false,
            status_period_secs: 1,
            status_burst_limit: 120,
            report_period_secs: 1,
            report_burst_limit: 30,
            servers_file: PathBuf::from("servers.json"),
            history_file: None,
            history_retention_hours: 168,
            status_refresh_secs: 10,
            history_sample_secs: 300, // 5 minutes
            history_min_interval_secs: 120,
            report_valid_secs: 120,
            query_timeout_ms: 3000,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: env_or("PORT", defaults.port),
            trust_proxy_headers: env_or("TRUST_PROXY_HEADERS", defaults.trust_proxy_headers),

            status_period_secs: env_or("STATUS_PERIOD_SECS", defaults.status_period_secs),
            status_burst_limit: env_or("STATUS_BURST_LIMIT", defaults.status_burst_limit),
            report_period_secs: env_or("REPORT_PERIOD_SECS", defaults.report_period_secs),
            report_burst_limit: env_or("REPORT_BURST_LIMIT", defaults.report_burst_limit),

            servers_file: env::var("SERVERS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.servers_file),
            history_file: env::var("HISTORY_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            history_retention_hours: env_or("HISTORY_RETENTION_HOURS", defaults.history_retention_hours),

            status_refresh_secs: env_or("STATUS_REFRESH_SECS", defaults.status_refresh_secs),
            history_sample_secs: env_or("HISTORY_SAMPLE_SECS", defaults.history_sample_secs),
            history_min_interval_secs: env_or(
                "HISTORY_MIN_INTERVAL_SECS",
                defaults.history_min_interval_secs,
            ),
            report_valid_secs: env_or("REPORT_VALID_SECS", defaults.report_valid_secs),
            query_timeout_ms: env_or("QUERY_TIMEOUT_MS", defaults.query_timeout_ms),
        }
    }

    pub fn bind(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn status_quota(&self) -> Quota {
        quota(self.status_period_secs, self.status_burst_limit)
    }

    pub fn report_quota(&self) -> Quota {
        quota(self.report_period_secs, self.report_burst_limit)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.status_refresh_secs.max(1))
    }

    pub fn history_interval(&self) -> Duration {
        Duration::from_secs(self.history_sample_secs.max(1))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    pub fn history_min_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.history_min_interval_secs.max(0))
    }

    pub fn report_validity(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.report_valid_secs.max(0))
    }

    pub fn history_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.history_retention_hours.max(1))
    }
}

fn quota(period_secs: u64, burst: u32) -> Quota {
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Quota::with_period(Duration::from_secs(period_secs.max(1)))
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_do_not_break_quotas() {
        let config = Config {
            status_period_secs: 0,
            status_burst_limit: 0,
            ..Config::default()
        };
        let _ = config.status_quota();
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
    }

    #[test]
    fn defaults_match_the_status_pipeline() {
        let config = Config::default();
        assert_eq!(config.report_validity(), chrono::Duration::seconds(120));
        assert_eq!(config.history_min_interval(), chrono::Duration::minutes(2));
        assert_eq!(config.query_timeout(), Duration::from_secs(3));
        assert_eq!(config.bind(), "0.0.0.0:8000");
    }
}
