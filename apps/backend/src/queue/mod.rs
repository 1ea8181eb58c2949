//! Reliable delayed task delivery.
//!
//! A task record lives in the store under its id with a retention TTL, and its
//! id sits in exactly one of three score-ordered indices:
//!
//! - `Delay`: waiting for its execute time,
//! - `Unack`: claimed by a worker, visible again after the TTR,
//! - `Error`: parked after a failed hand-off, swept back to `Delay`.
//!
//! Scores are unix milliseconds. Moving an id between indices is add-if-new
//! on the destination followed by removal from the source; only the caller
//! whose add created the member proceeds.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

pub mod memory;
pub mod redis_store;
pub mod worker;

pub use memory::MemoryTaskStore;
pub use redis_store::RedisTaskStore;
pub use worker::{Worker, WorkerConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Table the task concerns.
    pub topic: String,
    /// Stage name the dispatcher routes on.
    pub callback: String,
    pub payload: String,
    pub execute_time: i64,
    pub create_time: i64,
}

impl Task {
    /// A task due immediately.
    pub fn new(callback: impl Into<String>, topic: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            callback: callback.into(),
            payload: String::new(),
            execute_time: now,
            create_time: now,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.execute_time = now_millis().saturating_add(millis(delay));
        self
    }

    pub fn with_exec_time(mut self, at: OffsetDateTime) -> Self {
        self.execute_time = to_millis(at);
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Delay,
    Unack,
    Error,
}

impl QueueKind {
    pub const ALL: [QueueKind; 3] = [QueueKind::Delay, QueueKind::Unack, QueueKind::Error];

    pub const fn as_str(&self) -> &'static str {
        match self {
            QueueKind::Delay => "delay",
            QueueKind::Unack => "unack",
            QueueKind::Error => "error",
        }
    }
}

/// Outcome of an attempt to move a due id from `Delay` to `Unack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// This caller owns delivery.
    Claimed(Task),
    /// Another worker got there first, or the id already left `Delay`.
    Taken,
    /// The id was indexed but its record expired or could not be decoded.
    Orphaned,
}

/// Storage contract behind the queue. Implementations must make `claim` and
/// `requeue` atomic with respect to each other across processes.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist the record for `ttl` and index its id in `Delay` at its
    /// execute time.
    async fn schedule(&self, task: &Task, ttl: Duration) -> Result<(), AppError>;

    /// Ids in `queue` scored within `[from, to]`, oldest first.
    async fn due(
        &self,
        queue: QueueKind,
        from: i64,
        to: i64,
        limit: usize,
    ) -> Result<Vec<String>, AppError>;

    /// Move `id` from `Delay` to `Unack` scored at `visible_until`.
    async fn claim(&self, id: &str, visible_until: i64) -> Result<Claim, AppError>;

    /// Move `id` from `from` back to `Delay` at `at`. Returns whether it moved.
    async fn requeue(&self, from: QueueKind, id: &str, at: i64) -> Result<bool, AppError>;

    /// Move a claimed `id` from `Unack` to `Error` at `at`.
    async fn park(&self, id: &str, at: i64) -> Result<bool, AppError>;

    /// Drop the record and the id from every index.
    async fn delete(&self, id: &str) -> Result<(), AppError>;

    async fn get(&self, id: &str) -> Result<Option<Task>, AppError>;

    /// Which index currently holds `id`, if any.
    async fn location(&self, id: &str) -> Result<Option<QueueKind>, AppError>;
}

/// Producer handle used by request handlers and stage handlers.
#[derive(Clone)]
pub struct TaskQueue {
    store: std::sync::Arc<dyn TaskStore>,
    ttl: Duration,
}

impl TaskQueue {
    pub fn new(store: std::sync::Arc<dyn TaskStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn add_task(&self, task: Task) -> Result<(), AppError> {
        tracing::debug!(
            task_id = %task.id,
            callback = %task.callback,
            topic = %task.topic,
            execute_time = task.execute_time,
            "Scheduling task"
        );
        self.store.schedule(&task, self.ttl).await
    }

    pub fn store(&self) -> std::sync::Arc<dyn TaskStore> {
        self.store.clone()
    }
}

pub fn now_millis() -> i64 {
    to_millis(OffsetDateTime::now_utc())
}

pub fn to_millis(at: OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

pub fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_set_fields() {
        let before = now_millis();
        let task = Task::new("START_GAME", "7")
            .with_delay(Duration::from_secs(1))
            .with_payload("1,2,3,4")
            .with_topic("8");
        assert!(task.execute_time >= before + 1000);
        assert_eq!(task.topic, "8");
        assert_eq!(task.payload, "1,2,3,4");
        assert!(task.create_time <= task.execute_time);
    }

    #[test]
    fn exec_time_is_absolute() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let task = Task::new("FINISH_GAME", "1").with_exec_time(at);
        assert_eq!(task.execute_time, 1_700_000_000_000);
    }

    #[test]
    fn ids_are_unique() {
        let a = Task::new("NEXT_MOVE", "1");
        let b = Task::new("NEXT_MOVE", "1");
        assert_ne!(a.id, b.id);
    }
}
