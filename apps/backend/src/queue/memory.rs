//! In-process task store.
//!
//! One lock guards the records and all three indices, which makes every
//! transfer trivially atomic. Used by tests and single-process runs.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{millis, now_millis, Claim, QueueKind, Task, TaskStore};
use crate::error::AppError;

#[derive(Default)]
struct State {
    records: HashMap<String, (Task, i64)>,
    delay: HashMap<String, i64>,
    unack: HashMap<String, i64>,
    error: HashMap<String, i64>,
}

impl State {
    fn index(&mut self, kind: QueueKind) -> &mut HashMap<String, i64> {
        match kind {
            QueueKind::Delay => &mut self.delay,
            QueueKind::Unack => &mut self.unack,
            QueueKind::Error => &mut self.error,
        }
    }

    fn transfer(&mut self, from: QueueKind, to: QueueKind, id: &str, score: i64) -> bool {
        if !self.index(from).contains_key(id) || self.index(to).contains_key(id) {
            return false;
        }
        self.index(to).insert(id.to_string(), score);
        self.index(from).remove(id);
        true
    }

    fn live_record(&self, id: &str, now: i64) -> Option<Task> {
        self.records
            .get(id)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(task, _)| task.clone())
    }
}

#[derive(Default)]
pub struct MemoryTaskStore {
    state: Mutex<State>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids across all indices.
    pub fn indexed_len(&self) -> usize {
        let state = self.state.lock();
        state.delay.len() + state.unack.len() + state.error.len()
    }

    /// Rewrite the score of an indexed id, e.g. to age a claim past its TTR.
    pub fn set_score(&self, kind: QueueKind, id: &str, score: i64) -> bool {
        let mut state = self.state.lock();
        match state.index(kind).get_mut(id) {
            Some(existing) => {
                *existing = score;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn schedule(&self, task: &Task, ttl: Duration) -> Result<(), AppError> {
        let expires_at = now_millis().saturating_add(millis(ttl));
        let mut state = self.state.lock();
        state
            .records
            .insert(task.id.clone(), (task.clone(), expires_at));
        state.delay.insert(task.id.clone(), task.execute_time);
        Ok(())
    }

    async fn due(
        &self,
        queue: QueueKind,
        from: i64,
        to: i64,
        limit: usize,
    ) -> Result<Vec<String>, AppError> {
        let mut state = self.state.lock();
        let mut hits: Vec<(i64, String)> = state
            .index(queue)
            .iter()
            .filter(|(_, score)| **score >= from && **score <= to)
            .map(|(id, score)| (*score, id.clone()))
            .collect();
        hits.sort();
        Ok(hits.into_iter().take(limit).map(|(_, id)| id).collect())
    }

    async fn claim(&self, id: &str, visible_until: i64) -> Result<Claim, AppError> {
        let mut state = self.state.lock();
        if !state.transfer(QueueKind::Delay, QueueKind::Unack, id, visible_until) {
            return Ok(Claim::Taken);
        }
        Ok(match state.live_record(id, now_millis()) {
            Some(task) => Claim::Claimed(task),
            None => Claim::Orphaned,
        })
    }

    async fn requeue(&self, from: QueueKind, id: &str, at: i64) -> Result<bool, AppError> {
        Ok(self.state.lock().transfer(from, QueueKind::Delay, id, at))
    }

    async fn park(&self, id: &str, at: i64) -> Result<bool, AppError> {
        Ok(self
            .state
            .lock()
            .transfer(QueueKind::Unack, QueueKind::Error, id, at))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut state = self.state.lock();
        state.records.remove(id);
        for kind in QueueKind::ALL {
            state.index(kind).remove(id);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, AppError> {
        Ok(self.state.lock().live_record(id, now_millis()))
    }

    async fn location(&self, id: &str) -> Result<Option<QueueKind>, AppError> {
        let mut state = self.state.lock();
        Ok(QueueKind::ALL
            .into_iter()
            .find(|kind| state.index(*kind).contains_key(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn claim_is_single_winner() {
        let store = MemoryTaskStore::new();
        let task = Task::new("START_ROUND", "1");
        store.schedule(&task, Duration::from_secs(60)).await.unwrap();

        let first = store.claim(&task.id, now_millis() + 3000).await.unwrap();
        let second = store.claim(&task.id, now_millis() + 3000).await.unwrap();

        assert_eq!(first, Claim::Claimed(task.clone()));
        assert_eq!(second, Claim::Taken);
        assert_eq!(
            store.location(&task.id).await.unwrap(),
            Some(QueueKind::Unack)
        );
    }

    #[tokio::test]
    async fn claim_after_delete_does_not_resurrect() {
        let store = MemoryTaskStore::new();
        let task = Task::new("START_DEAL", "1");
        store.schedule(&task, Duration::from_secs(60)).await.unwrap();
        store.delete(&task.id).await.unwrap();

        assert_eq!(store.claim(&task.id, 0).await.unwrap(), Claim::Taken);
        assert_eq!(store.indexed_len(), 0);
    }

    #[tokio::test]
    async fn expired_record_is_orphaned() {
        let store = MemoryTaskStore::new();
        let task = Task::new("NEXT_MOVE", "1");
        store.schedule(&task, Duration::ZERO).await.unwrap();

        assert_eq!(store.claim(&task.id, 0).await.unwrap(), Claim::Orphaned);
    }

    #[tokio::test]
    async fn due_respects_window_and_limit() {
        let store = MemoryTaskStore::new();
        let mut ids = Vec::new();
        for offset in [30, 10, 20] {
            let mut task = Task::new("NEXT_MOVE", "1");
            task.execute_time = 1_000 + offset;
            store.schedule(&task, Duration::from_secs(60)).await.unwrap();
            ids.push((offset, task.id));
        }
        ids.sort();

        let due = store.due(QueueKind::Delay, 0, 1_025, 10).await.unwrap();
        assert_eq!(due, vec![ids[0].1.clone(), ids[1].1.clone()]);

        let limited = store.due(QueueKind::Delay, 0, 2_000, 1).await.unwrap();
        assert_eq!(limited, vec![ids[0].1.clone()]);
    }
}
