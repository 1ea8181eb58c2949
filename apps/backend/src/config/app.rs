//! Process configuration read once from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::queue::WorkerConfig;

use super::db::db_url;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub worker: WorkerConfig,
    /// Delay between one lifecycle stage and the next.
    pub stage_delay: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = WorkerConfig::default();
        let worker = WorkerConfig {
            delay_interval: Duration::from_millis(var_or("QUEUE_DELAY_INTERVAL_MS", 100)?),
            unack_interval: Duration::from_millis(var_or("QUEUE_UNACK_INTERVAL_MS", 300)?),
            error_interval: Duration::from_millis(var_or("QUEUE_ERROR_INTERVAL_MS", 300)?),
            ttl: Duration::from_secs(var_or("QUEUE_TASK_TTL_SECS", defaults.ttl.as_secs())?),
            ttr: Duration::from_millis(var_or("QUEUE_TASK_TTR_MS", 3_000)?),
            pool_count: var_or("QUEUE_POOL_COUNT", defaults.pool_count)?,
        };
        if worker.pool_count == 0 {
            return Err(AppError::config("QUEUE_POOL_COUNT must be at least 1"));
        }

        Ok(Self {
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: var_or("BACKEND_PORT", 3001)?,
            database_url: db_url()?,
            redis_url: env::var("REDIS_URL")
                .map_err(|_| AppError::config("Required environment variable 'REDIS_URL' is not set"))?,
            worker,
            stage_delay: Duration::from_millis(var_or("STAGE_DELAY_MS", 1_000)?),
        })
    }
}

/// Parse `name` when set, `default` otherwise. A value that does not parse
/// is a configuration error rather than a silent fallback.
fn var_or<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::config(format!("{name} has an invalid value: {raw:?}"))),
        Err(_) => Ok(default),
    }
}
