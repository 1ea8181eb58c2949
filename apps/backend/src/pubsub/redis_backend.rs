//! Redis realtime backend.
//!
//! `player:{id}` holds the player's current remote, `room:{id}` is the set of
//! player ids watching a table, and delivery is a `PUBLISH` on the remote's
//! channel.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::time::sleep;
use tracing::warn;

use super::RealtimeBackend;
use crate::error::AppError;
use crate::errors::ErrorCode;

// Publisher retry configuration (request and stage paths)
const PUBLISHER_MAX_ATTEMPTS: u32 = 3;
const PUBLISHER_INITIAL_RETRY_DELAY_MS: u64 = 50;
const PUBLISHER_MAX_RETRY_DELAY_MS: u64 = 200;

fn player_key(player_id: i64) -> String {
    format!("player:{player_id}")
}

fn room_key(table_id: i64) -> String {
    format!("room:{table_id}")
}

fn pubsub_error(err: redis::RedisError) -> AppError {
    AppError::unavailable(
        ErrorCode::PubSubUnavailable,
        format!("realtime store error: {err}"),
    )
}

#[derive(Clone)]
pub struct RedisRealtime {
    conn: ConnectionManager,
}

impl RedisRealtime {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = Client::open(redis_url)
            .map_err(|err| AppError::config(format!("Invalid REDIS_URL: {err}")))?;
        let conn = ConnectionManager::new(client).await.map_err(|err| {
            AppError::unavailable(
                ErrorCode::PubSubUnavailable,
                format!("Unable to initialize Redis connection manager: {err}"),
            )
        })?;
        Ok(Self { conn })
    }

    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RealtimeBackend for RedisRealtime {
    async fn bind(&self, remote: &str, player_id: i64) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(player_key(player_id), remote)
            .await
            .map_err(pubsub_error)
    }

    async fn unbind(&self, player_id: i64) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(player_key(player_id))
            .await
            .map_err(pubsub_error)
    }

    async fn remote_for(&self, player_id: i64) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(player_key(player_id))
            .await
            .map_err(pubsub_error)
    }

    async fn add_to_room(&self, table_id: i64, player_id: i64) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let added: i64 = conn
            .sadd(room_key(table_id), player_id)
            .await
            .map_err(pubsub_error)?;
        Ok(added == 1)
    }

    async fn remove_from_room(&self, table_id: i64, player_id: i64) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .srem(room_key(table_id), player_id)
            .await
            .map_err(pubsub_error)?;
        Ok(removed == 1)
    }

    async fn room_members(&self, table_id: i64) -> Result<Vec<i64>, AppError> {
        let mut conn = self.conn.clone();
        conn.smembers::<_, Vec<i64>>(room_key(table_id))
            .await
            .map_err(pubsub_error)
    }

    async fn is_member(&self, table_id: i64, player_id: i64) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        conn.sismember::<_, _, bool>(room_key(table_id), player_id)
            .await
            .map_err(pubsub_error)
    }

    async fn drop_room(&self, table_id: i64) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(room_key(table_id))
            .await
            .map_err(pubsub_error)
    }

    async fn deliver(&self, remote: &str, payload: String) -> Result<(), AppError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let mut conn = self.conn.clone();
            match conn.publish::<_, _, ()>(remote, payload.as_str()).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    let transient = err.is_timeout()
                        || err.is_connection_dropped()
                        || err.is_connection_refusal()
                        || err.is_io_error();
                    let app_err = pubsub_error(err);

                    if attempt >= PUBLISHER_MAX_ATTEMPTS || !transient {
                        return Err(app_err);
                    }

                    let delay_ms = PUBLISHER_INITIAL_RETRY_DELAY_MS
                        .saturating_mul(2_u64.pow(attempt - 1))
                        .min(PUBLISHER_MAX_RETRY_DELAY_MS);
                    warn!(
                        error = %app_err,
                        attempt,
                        retry_delay_ms = delay_ms,
                        "Redis publish failed, retrying"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}
