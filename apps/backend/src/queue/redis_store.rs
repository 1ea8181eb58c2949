//! Redis-backed task store.
//!
//! Records are plain string keys with an expiry; the three indices are sorted
//! sets scored by unix milliseconds. Transfers between indices run as Lua
//! scripts so the membership check, the add and the removal happen as one
//! step on the server.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use tracing::warn;

use super::{Claim, QueueKind, Task, TaskStore};
use crate::error::AppError;
use crate::errors::ErrorCode;

const DELAY_KEY: &str = "rmq_delay_queue";
const UNACK_KEY: &str = "rmq_unack_queue";
const ERROR_KEY: &str = "rmq_error_queue";
const RECORD_PREFIX: &str = "rmq_task:";

// KEYS: delay, unack, record. ARGV: id, visible_until.
static CLAIM_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
        if not redis.call('ZSCORE', KEYS[1], ARGV[1]) then
            return {'taken'}
        end
        if redis.call('ZADD', KEYS[2], 'NX', ARGV[2], ARGV[1]) == 0 then
            return {'taken'}
        end
        redis.call('ZREM', KEYS[1], ARGV[1])
        local record = redis.call('GET', KEYS[3])
        if not record then
            return {'orphaned'}
        end
        return {'claimed', record}
        ",
    )
});

// KEYS: from, to. ARGV: id, score.
static TRANSFER_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
        if not redis.call('ZSCORE', KEYS[1], ARGV[1]) then
            return 0
        end
        if redis.call('ZADD', KEYS[2], 'NX', ARGV[2], ARGV[1]) == 0 then
            return 0
        end
        redis.call('ZREM', KEYS[1], ARGV[1])
        return 1
        ",
    )
});

fn index_key(kind: QueueKind) -> &'static str {
    match kind {
        QueueKind::Delay => DELAY_KEY,
        QueueKind::Unack => UNACK_KEY,
        QueueKind::Error => ERROR_KEY,
    }
}

fn record_key(id: &str) -> String {
    format!("{RECORD_PREFIX}{id}")
}

#[derive(Clone)]
pub struct RedisTaskStore {
    conn: ConnectionManager,
}

impl RedisTaskStore {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = Client::open(redis_url)
            .map_err(|err| AppError::config(format!("Invalid REDIS_URL: {err}")))?;
        let conn = ConnectionManager::new(client).await.map_err(|err| {
            AppError::unavailable(
                ErrorCode::QueueUnavailable,
                format!("Unable to initialize Redis connection manager: {err}"),
            )
        })?;
        Ok(Self { conn })
    }

    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn transfer(
        &self,
        from: QueueKind,
        to: QueueKind,
        id: &str,
        score: i64,
    ) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let moved: i64 = TRANSFER_SCRIPT
            .key(index_key(from))
            .key(index_key(to))
            .arg(id)
            .arg(score)
            .invoke_async(&mut conn)
            .await?;
        Ok(moved == 1)
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn schedule(&self, task: &Task, ttl: Duration) -> Result<(), AppError> {
        let encoded = serde_json::to_string(task)?;
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(record_key(&task.id))
            .arg(encoded)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .ignore()
            .cmd("ZADD")
            .arg(DELAY_KEY)
            .arg(task.execute_time)
            .arg(&task.id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn due(
        &self,
        queue: QueueKind,
        from: i64,
        to: i64,
        limit: usize,
    ) -> Result<Vec<String>, AppError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = redis::cmd("ZRANGEBYSCORE")
            .arg(index_key(queue))
            .arg(from)
            .arg(to)
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query_async(&mut conn)
            .await?;
        Ok(ids)
    }

    async fn claim(&self, id: &str, visible_until: i64) -> Result<Claim, AppError> {
        let mut conn = self.conn.clone();
        let reply: Vec<String> = CLAIM_SCRIPT
            .key(DELAY_KEY)
            .key(UNACK_KEY)
            .key(record_key(id))
            .arg(id)
            .arg(visible_until)
            .invoke_async(&mut conn)
            .await?;

        match reply.as_slice() {
            [status, record] if status == "claimed" => match serde_json::from_str(record) {
                Ok(task) => Ok(Claim::Claimed(task)),
                Err(err) => {
                    warn!(task_id = id, error = %err, "Undecodable task record");
                    Ok(Claim::Orphaned)
                }
            },
            [status] if status == "orphaned" => Ok(Claim::Orphaned),
            _ => Ok(Claim::Taken),
        }
    }

    async fn requeue(&self, from: QueueKind, id: &str, at: i64) -> Result<bool, AppError> {
        self.transfer(from, QueueKind::Delay, id, at).await
    }

    async fn park(&self, id: &str, at: i64) -> Result<bool, AppError> {
        self.transfer(QueueKind::Unack, QueueKind::Error, id, at)
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(record_key(id))
            .ignore()
            .cmd("ZREM")
            .arg(DELAY_KEY)
            .arg(id)
            .ignore()
            .cmd("ZREM")
            .arg(UNACK_KEY)
            .arg(id)
            .ignore()
            .cmd("ZREM")
            .arg(ERROR_KEY)
            .arg(id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, AppError> {
        let mut conn = self.conn.clone();
        let record: Option<String> = redis::cmd("GET")
            .arg(record_key(id))
            .query_async(&mut conn)
            .await?;
        match record {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn location(&self, id: &str) -> Result<Option<QueueKind>, AppError> {
        let mut conn = self.conn.clone();
        for kind in QueueKind::ALL {
            let score: Option<f64> = redis::cmd("ZSCORE")
                .arg(index_key(kind))
                .arg(id)
                .query_async(&mut conn)
                .await?;
            if score.is_some() {
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable() {
        assert_eq!(index_key(QueueKind::Delay), "rmq_delay_queue");
        assert_eq!(index_key(QueueKind::Unack), "rmq_unack_queue");
        assert_eq!(index_key(QueueKind::Error), "rmq_error_queue");
        assert_eq!(record_key("abc"), "rmq_task:abc");
    }
}
