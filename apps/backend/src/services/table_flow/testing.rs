//! In-memory fixture for the table flow unit tests.

use std::sync::Arc;
use std::time::Duration;

use super::TableFlowService;
use crate::engine::BelkaEngine;
use crate::pubsub::{MemoryRealtime, PubSub};
use crate::queue::{MemoryTaskStore, QueueKind, Task, TaskQueue, TaskStore};
use crate::repos::{
    Currency, GameRepository, MemoryRepository, ParticipantState, ParticipantUpdate, TableCreate,
};
use crate::services::RequestContext;

pub(crate) struct Harness {
    pub repo: Arc<MemoryRepository>,
    pub realtime: Arc<MemoryRealtime>,
    pub tasks: Arc<MemoryTaskStore>,
    pub flow: Arc<TableFlowService>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_repo(MemoryRepository::new())
    }

    /// Repository calls yield, so handlers joined on one task overlap.
    pub async fn interleaved() -> Self {
        Self::with_repo(MemoryRepository::interleaved())
    }

    fn with_repo(repo: MemoryRepository) -> Self {
        let repo = Arc::new(repo);
        let realtime = Arc::new(MemoryRealtime::new());
        let tasks = Arc::new(MemoryTaskStore::new());
        let flow = TableFlowService::new(
            repo.clone(),
            Arc::new(BelkaEngine::with_seed(7)),
            PubSub::new(realtime.clone()),
            TaskQueue::new(tasks.clone(), Duration::from_secs(60)),
        )
        .with_stage_delay(Duration::ZERO);
        Self {
            repo,
            realtime,
            tasks,
            flow: Arc::new(flow),
        }
    }

    /// Player `n` (1-based), created on first use and bound to `remote-n`.
    pub async fn player(&self, n: usize) -> i64 {
        let player = self
            .repo
            .select_or_insert_player(&format!("user-{n}"), &format!("Player {n}"))
            .await
            .unwrap();
        self.flow
            .pubsub()
            .bind(&format!("remote-{n}"), player.id)
            .await
            .unwrap();
        player.id
    }

    pub async fn ctx(&self, n: usize) -> RequestContext {
        let player_id = self.player(n).await;
        RequestContext::new(format!("remote-{n}")).with_player(player_id)
    }

    /// Fresh table with players 1..=n seated in order, READY and in the room.
    pub async fn table_with_players(&self, n: usize) -> i64 {
        let (table, seats) = self
            .repo
            .create_table(TableCreate::new(10, Currency::Nuts))
            .await
            .unwrap();
        for (i, seat) in seats.iter().take(n).enumerate() {
            let player_id = self.player(i + 1).await;
            assert!(self.repo.claim_seat(seat.id, player_id).await.unwrap());
            self.repo
                .update_participant(ParticipantUpdate::new(seat.id).with_state(ParticipantState::Ready))
                .await
                .unwrap();
            self.flow.pubsub().room(table.id).add(player_id).await.unwrap();
        }
        table.id
    }

    pub async fn ready_table(&self) -> i64 {
        self.table_with_players(4).await
    }

    pub async fn started_table(&self) -> i64 {
        let table_id = self.ready_table().await;
        self.flow.start_game(table_id, "").await.unwrap();
        self.drain_tasks().await;
        table_id
    }

    /// Tasks waiting in the delay index, oldest first.
    pub async fn scheduled(&self) -> Vec<Task> {
        let ids = self
            .tasks
            .due(QueueKind::Delay, 0, i64::MAX, 1_000)
            .await
            .unwrap();
        let mut tasks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(task) = self.tasks.get(&id).await.unwrap() {
                tasks.push(task);
            }
        }
        tasks
    }

    /// Drop everything scheduled so far and return the stage names.
    pub async fn drain_tasks(&self) -> Vec<String> {
        let tasks = self.scheduled().await;
        for task in &tasks {
            self.tasks.delete(&task.id).await.unwrap();
        }
        tasks.into_iter().map(|t| t.callback).collect()
    }
}
