//! Polling worker that moves due tasks onto the delivery channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{millis, now_millis, Claim, QueueKind, Task, TaskStore};
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub delay_interval: Duration,
    pub unack_interval: Duration,
    pub error_interval: Duration,
    /// How far back scans look.
    pub ttl: Duration,
    /// Visibility timeout of a claimed task.
    pub ttr: Duration,
    /// Scan batch size and delivery channel capacity.
    pub pool_count: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            delay_interval: Duration::from_millis(100),
            unack_interval: Duration::from_millis(300),
            error_interval: Duration::from_millis(300),
            ttl: Duration::from_secs(24 * 60 * 60),
            ttr: Duration::from_secs(3),
            pool_count: 20,
        }
    }
}

pub struct Worker {
    store: Arc<dyn TaskStore>,
    config: WorkerConfig,
    tx: mpsc::Sender<Task>,
}

impl Worker {
    /// Build a worker and the receiving end of its delivery channel.
    pub fn new(store: Arc<dyn TaskStore>, config: WorkerConfig) -> (Self, mpsc::Receiver<Task>) {
        let (tx, rx) = mpsc::channel(config.pool_count.max(1));
        (Self { store, config, tx }, rx)
    }

    fn window(&self) -> (i64, i64) {
        let now = now_millis();
        (now.saturating_sub(millis(self.config.ttl)), now)
    }

    /// Claim and deliver every due id in `Delay`. Returns how many were sent.
    pub async fn poll_delay(&self) -> Result<usize, AppError> {
        let (from, to) = self.window();
        let ids = self
            .store
            .due(QueueKind::Delay, from, to, self.config.pool_count)
            .await?;

        let mut delivered = 0;
        for id in ids {
            let visible_until = now_millis().saturating_add(millis(self.config.ttr));
            match self.store.claim(&id, visible_until).await? {
                Claim::Claimed(task) => {
                    if self.tx.send(task).await.is_err() {
                        warn!(task_id = %id, "Delivery channel closed, parking task");
                        self.store.park(&id, now_millis()).await?;
                        continue;
                    }
                    // record goes before the handler runs; a failing handler loses the stage
                    self.store.delete(&id).await?;
                    delivered += 1;
                }
                Claim::Taken => {
                    debug!(task_id = %id, "Task claimed elsewhere");
                }
                Claim::Orphaned => {
                    warn!(task_id = %id, "Task record missing, dropping index entry");
                    self.store.delete(&id).await?;
                }
            }
        }
        Ok(delivered)
    }

    /// Move ids whose score has passed from `queue` back to `Delay`.
    pub async fn sweep(&self, queue: QueueKind) -> Result<usize, AppError> {
        let (from, to) = self.window();
        let ids = self
            .store
            .due(queue, from, to, self.config.pool_count)
            .await?;

        let mut moved = 0;
        for id in ids {
            if self.store.requeue(queue, &id, now_millis()).await? {
                info!(task_id = %id, queue = queue.as_str(), "Requeued task");
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Run all three loops until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut delay_tick = interval(self.config.delay_interval);
        let mut unack_tick = interval(self.config.unack_interval);
        let mut error_tick = interval(self.config.error_interval);
        for tick in [&mut delay_tick, &mut unack_tick, &mut error_tick] {
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        info!(
            delay_interval_ms = self.config.delay_interval.as_millis() as u64,
            ttr_ms = self.config.ttr.as_millis() as u64,
            pool_count = self.config.pool_count,
            "Task worker started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = delay_tick.tick() => {
                    if let Err(err) = self.poll_delay().await {
                        warn!(error = %err, "Delay scan failed");
                    }
                }
                _ = unack_tick.tick() => {
                    if let Err(err) = self.sweep(QueueKind::Unack).await {
                        warn!(error = %err, "Unack sweep failed");
                    }
                }
                _ = error_tick.tick() => {
                    if let Err(err) = self.sweep(QueueKind::Error).await {
                        warn!(error = %err, "Error sweep failed");
                    }
                }
            }
        }

        info!("Task worker stopped");
    }
}
