#![allow(dead_code)]

//! Shared fixture for the integration tests: the table service over
//! in-memory backends, plus polling helpers for the stage pipeline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use belka_backend::engine::belka::follows_lead;
use belka_backend::engine::{BelkaEngine, Signature};
use belka_backend::pubsub::{MemoryRealtime, PubSub};
use belka_backend::queue::{MemoryTaskStore, TaskQueue, WorkerConfig};
use belka_backend::repos::{Currency, GameRepository, MemoryRepository};
use belka_backend::{AppState, RequestContext, TableFlowService};
use tokio::time::{sleep, Instant};

pub mod proptest_prelude;

// Logging is auto-installed for every test binary
#[ctor::ctor]
fn init_logging() {
    backend_test_support::logging::init();
}

pub struct Fixture {
    pub repo: Arc<MemoryRepository>,
    pub realtime: Arc<MemoryRealtime>,
    pub tasks: Arc<MemoryTaskStore>,
    pub state: AppState,
}

impl Fixture {
    /// In-memory service with a seeded engine and no delay between stages.
    pub fn new(seed: u64) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let realtime = Arc::new(MemoryRealtime::new());
        let tasks = Arc::new(MemoryTaskStore::new());
        let flow = TableFlowService::new(
            repo.clone(),
            Arc::new(BelkaEngine::with_seed(seed)),
            PubSub::new(realtime.clone()),
            TaskQueue::new(tasks.clone(), Duration::from_secs(60)),
        )
        .with_stage_delay(Duration::ZERO);
        let state = AppState::new(Arc::new(flow), tasks.clone());
        Self {
            repo,
            realtime,
            tasks,
            state,
        }
    }

    pub fn flow(&self) -> &Arc<TableFlowService> {
        &self.state.flow
    }

    /// Open a session for player `n` on `remote-n`.
    pub async fn login(&self, n: usize) -> RequestContext {
        let remote = format!("remote-{n}");
        let opened = self
            .flow()
            .open_session(&remote, &format!("user-{n}"), &format!("Player {n}"))
            .await
            .unwrap();
        RequestContext::new(remote).with_player(opened.player_id)
    }

    /// Four logged-in players seated in order and READY. Returns the table
    /// id and the players' contexts, seat 1 first.
    pub async fn ready_table(&self) -> (i64, Vec<RequestContext>) {
        let mut ctxs = Vec::with_capacity(4);
        for n in 1..=4 {
            ctxs.push(self.login(n).await);
        }
        let table = self
            .flow()
            .create_table(&ctxs[0], 10, Currency::Nuts)
            .await
            .unwrap();
        for (i, ctx) in ctxs.iter().enumerate() {
            self.flow().join_table(ctx, table.id).await.unwrap();
            self.flow()
                .become_participant(ctx, table.id, Some(i as i16 + 1))
                .await
                .unwrap();
            self.flow().ready(ctx, table.id).await.unwrap();
        }
        (table.id, ctxs)
    }

    /// Current table signature, parsed.
    pub async fn signature(&self, table_id: i64) -> Signature {
        let table = self.repo.find_table(table_id).await.unwrap().unwrap();
        table.signature.parse().unwrap()
    }

    pub async fn waits_for_move(&self, table_id: i64) -> bool {
        self.repo
            .find_current_deal_order_for_table(table_id)
            .await
            .unwrap()
            .is_some()
    }
}

/// Short intervals so pipeline tests finish quickly.
pub fn fast_worker() -> WorkerConfig {
    WorkerConfig {
        delay_interval: Duration::from_millis(5),
        unack_interval: Duration::from_millis(50),
        error_interval: Duration::from_millis(50),
        ttl: Duration::from_secs(60),
        ttr: Duration::from_millis(500),
        pool_count: 8,
    }
}

/// Poll `check` until it holds, failing after `timeout`.
pub async fn eventually<F, Fut>(what: &str, timeout: Duration, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check().await {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        sleep(Duration::from_millis(2)).await;
    }
}

/// First card the seat to move may legally play.
pub fn legal_card(sig: &Signature) -> String {
    let hand = &sig.hands[usize::from(sig.turn % 4)];
    hand.iter()
        .copied()
        .find(|card| follows_lead(&sig.table, hand, *card, sig.trump))
        .map(|card| card.to_string())
        .expect("hand has a legal card")
}

/// A card from the mover's hand that breaks the follow rule, if one exists.
pub fn illegal_card(sig: &Signature) -> Option<String> {
    let hand = &sig.hands[usize::from(sig.turn % 4)];
    hand.iter()
        .copied()
        .find(|card| !follows_lead(&sig.table, hand, *card, sig.trump))
        .map(|card| card.to_string())
}
