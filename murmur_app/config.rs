use dotenvy::dotenv;
use std::env;
use std::time::Duration;

pub struct Config {
    /// Retry ceiling applied when the enqueuer does not pass one.
    pub default_max_attempts: i32,
    /// How long a claim may sit in claimed/running before the reconciler
    /// treats the holding worker as gone.
    pub lease_timeout: Duration,
    /// How long a poller sleeps when no work is available.
    pub idle_poll_interval: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub reconcile_interval: Duration,
    pub worker_count: usize,
    pub http_port: u16,
    pub pipeline_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let default_max_attempts = match env::var("MURMUR_DEFAULT_MAX_ATTEMPTS") {
            Ok(val) => val.parse::<i32>().unwrap_or(3).max(1),
            Err(_) => 3,
        };

        let lease_timeout = match env::var("MURMUR_LEASE_TIMEOUT_SECS") {
            Ok(val) => Duration::from_secs(val.parse::<u64>().unwrap_or(120)),
            Err(_) => Duration::from_secs(120),
        };

        let idle_poll_interval = match env::var("MURMUR_IDLE_POLL_INTERVAL_MS") {
            Ok(val) => Duration::from_millis(val.parse::<u64>().unwrap_or(1000)),
            Err(_) => Duration::from_millis(1000),
        };

        let backoff_base = match env::var("MURMUR_BACKOFF_BASE_SECS") {
            Ok(val) => Duration::from_secs(val.parse::<u64>().unwrap_or(2)),
            Err(_) => Duration::from_secs(2),
        };

        let backoff_cap = match env::var("MURMUR_BACKOFF_CAP_SECS") {
            Ok(val) => Duration::from_secs(val.parse::<u64>().unwrap_or(300)),
            Err(_) => Duration::from_secs(300),
        };

        let reconcile_interval = match env::var("MURMUR_RECONCILE_INTERVAL_SECS") {
            Ok(val) => Duration::from_secs(val.parse::<u64>().unwrap_or(30)),
            Err(_) => Duration::from_secs(30),
        };

        let worker_count = match env::var("MURMUR_WORKER_COUNT") {
            Ok(val) => val.parse::<usize>().unwrap_or(2).clamp(1, 32),
            Err(_) => 2,
        };

        let http_port = match env::var("MURMUR_HTTP_PORT") {
            Ok(val) => val.parse::<u16>().unwrap_or(8080),
            Err(_) => 8080,
        };

        let pipeline_url = match env::var("MURMUR_PIPELINE_URL") {
            Ok(val) => val,
            Err(_) => "http://localhost:9090".to_string(),
        };

        Self {
            default_max_attempts,
            lease_timeout,
            idle_poll_interval,
            backoff_base,
            backoff_cap,
            reconcile_interval,
            worker_count,
            http_port,
            pipeline_url,
        }
    }
}
