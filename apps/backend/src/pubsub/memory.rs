//! In-process realtime backend that records every delivery.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::RealtimeBackend;
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryRealtime {
    remotes: DashMap<i64, String>,
    rooms: DashMap<i64, BTreeSet<i64>>,
    delivered: DashMap<String, Vec<String>>,
}

impl MemoryRealtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded envelopes delivered to `remote`, oldest first.
    pub fn delivered_to(&self, remote: &str) -> Vec<Value> {
        self.delivered
            .get(remote)
            .map(|msgs| {
                msgs.iter()
                    .filter_map(|raw| serde_json::from_str(raw).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Event names delivered to `remote`, oldest first.
    pub fn events_for(&self, remote: &str) -> Vec<String> {
        self.delivered_to(remote)
            .into_iter()
            .filter_map(|v| v["event"].as_str().map(str::to_string))
            .collect()
    }

    pub fn clear_deliveries(&self) {
        self.delivered.clear();
    }
}

#[async_trait]
impl RealtimeBackend for MemoryRealtime {
    async fn bind(&self, remote: &str, player_id: i64) -> Result<(), AppError> {
        self.remotes.insert(player_id, remote.to_string());
        Ok(())
    }

    async fn unbind(&self, player_id: i64) -> Result<(), AppError> {
        self.remotes.remove(&player_id);
        Ok(())
    }

    async fn remote_for(&self, player_id: i64) -> Result<Option<String>, AppError> {
        Ok(self.remotes.get(&player_id).map(|r| r.value().clone()))
    }

    async fn add_to_room(&self, table_id: i64, player_id: i64) -> Result<bool, AppError> {
        Ok(self.rooms.entry(table_id).or_default().insert(player_id))
    }

    async fn remove_from_room(&self, table_id: i64, player_id: i64) -> Result<bool, AppError> {
        Ok(self
            .rooms
            .get_mut(&table_id)
            .map(|mut members| members.remove(&player_id))
            .unwrap_or(false))
    }

    async fn room_members(&self, table_id: i64) -> Result<Vec<i64>, AppError> {
        Ok(self
            .rooms
            .get(&table_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn is_member(&self, table_id: i64, player_id: i64) -> Result<bool, AppError> {
        Ok(self
            .rooms
            .get(&table_id)
            .is_some_and(|members| members.contains(&player_id)))
    }

    async fn drop_room(&self, table_id: i64) -> Result<(), AppError> {
        self.rooms.remove(&table_id);
        Ok(())
    }

    async fn deliver(&self, remote: &str, payload: String) -> Result<(), AppError> {
        self.delivered
            .entry(remote.to_string())
            .or_default()
            .push(payload);
        Ok(())
    }
}
