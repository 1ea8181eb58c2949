use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::AppConfig;
use crate::engine::{BelkaEngine, RulesEngine};
use crate::error::AppError;
use crate::infra::db::bootstrap_db;
use crate::pubsub::{MemoryRealtime, PubSub, RealtimeBackend, RedisRealtime};
use crate::queue::{MemoryTaskStore, RedisTaskStore, TaskQueue, TaskStore, WorkerConfig};
use crate::repos::{GameRepository, MemoryRepository, SeaRepository};
use crate::services::TableFlowService;
use crate::state::app_state::AppState;

/// Builder for AppState instances (used in both tests and main).
///
/// Without a config every backend is in-memory; with one the repository is
/// Postgres and the queue and realtime stores are Redis.
pub struct StateBuilder {
    config: Option<AppConfig>,
    engine: Option<Arc<dyn RulesEngine>>,
    stage_delay: Duration,
    task_ttl: Duration,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            engine: None,
            stage_delay: Duration::from_secs(1),
            task_ttl: WorkerConfig::default().ttl,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.stage_delay = config.stage_delay;
        self.task_ttl = config.worker.ttl;
        self.config = Some(config);
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn RulesEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.stage_delay = delay;
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let engine = self
            .engine
            .unwrap_or_else(|| Arc::new(BelkaEngine::new()) as Arc<dyn RulesEngine>);

        let repo: Arc<dyn GameRepository>;
        let realtime: Arc<dyn RealtimeBackend>;
        let tasks: Arc<dyn TaskStore>;
        let mut db = None;
        match &self.config {
            Some(config) => {
                let conn = bootstrap_db(&config.database_url).await?;
                tasks = Arc::new(RedisTaskStore::connect(&config.redis_url).await?);
                realtime = Arc::new(RedisRealtime::connect(&config.redis_url).await?);
                repo = Arc::new(SeaRepository::new(conn.clone()));
                db = Some(conn);
                info!("Connected to Postgres and Redis");
            }
            None => {
                repo = Arc::new(MemoryRepository::new());
                realtime = Arc::new(MemoryRealtime::new());
                tasks = Arc::new(MemoryTaskStore::new());
            }
        }

        let flow = TableFlowService::new(
            repo,
            engine,
            PubSub::new(realtime),
            TaskQueue::new(tasks.clone(), self.task_ttl),
        )
        .with_stage_delay(self.stage_delay);

        let state = AppState::new(Arc::new(flow), tasks);
        Ok(match db {
            Some(db) => state.with_db(db),
            None => state,
        })
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_in_memory_without_config() {
        let state = build_state().build().await.unwrap();
        assert!(state.db().is_none());
        assert!(state.flow.get_open_tables().await.unwrap().is_empty());
    }
}
