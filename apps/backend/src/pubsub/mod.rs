//! Player directory, table rooms and event delivery.
//!
//! A player is bound to the remote (client channel) of their open session.
//! Rooms hold player ids per table; room publishes resolve each member to
//! their current remote and deliver to each one independently.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::AppError;

pub mod events;
pub mod memory;
pub mod redis_backend;

pub use events::{EventEnvelope, SeatView, TableView};
pub use memory::MemoryRealtime;
pub use redis_backend::RedisRealtime;

#[async_trait]
pub trait RealtimeBackend: Send + Sync {
    async fn bind(&self, remote: &str, player_id: i64) -> Result<(), AppError>;

    async fn unbind(&self, player_id: i64) -> Result<(), AppError>;

    async fn remote_for(&self, player_id: i64) -> Result<Option<String>, AppError>;

    /// Returns false when the player was already a member.
    async fn add_to_room(&self, table_id: i64, player_id: i64) -> Result<bool, AppError>;

    /// Returns false when the player was not a member.
    async fn remove_from_room(&self, table_id: i64, player_id: i64) -> Result<bool, AppError>;

    async fn room_members(&self, table_id: i64) -> Result<Vec<i64>, AppError>;

    async fn is_member(&self, table_id: i64, player_id: i64) -> Result<bool, AppError>;

    /// Forget the room entirely.
    async fn drop_room(&self, table_id: i64) -> Result<(), AppError>;

    /// Push an encoded envelope to one remote.
    async fn deliver(&self, remote: &str, payload: String) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PubSub {
    backend: Arc<dyn RealtimeBackend>,
}

impl PubSub {
    pub fn new(backend: Arc<dyn RealtimeBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn RealtimeBackend> {
        &self.backend
    }

    /// Deliver to one remote. Failures are logged, never returned.
    pub async fn publish(&self, remote: &str, event: &EventEnvelope) {
        if let Err(err) = self.try_publish(remote, event).await {
            warn!(remote, event = event.name(), error = %err, "Event delivery failed");
        }
    }

    pub async fn try_publish(&self, remote: &str, event: &EventEnvelope) -> Result<(), AppError> {
        let payload = serde_json::to_string(event)?;
        debug!(remote, event = event.name(), "Delivering event");
        self.backend.deliver(remote, payload).await
    }

    /// Deliver to a player's current remote, if they have one.
    pub async fn to_player(&self, player_id: i64, event: &EventEnvelope) {
        match self.backend.remote_for(player_id).await {
            Ok(Some(remote)) => self.publish(&remote, event).await,
            Ok(None) => debug!(player_id, event = event.name(), "Player has no live remote"),
            Err(err) => warn!(player_id, error = %err, "Remote lookup failed"),
        }
    }

    pub fn room(&self, table_id: i64) -> Room<'_> {
        Room {
            pubsub: self,
            table_id,
        }
    }

    pub async fn bind(&self, remote: &str, player_id: i64) -> Result<(), AppError> {
        self.backend.bind(remote, player_id).await
    }

    pub async fn unbind(&self, player_id: i64) -> Result<(), AppError> {
        self.backend.unbind(player_id).await
    }
}

pub struct Room<'a> {
    pubsub: &'a PubSub,
    table_id: i64,
}

impl Room<'_> {
    pub fn id(&self) -> i64 {
        self.table_id
    }

    /// Same event to every member.
    pub async fn publish(&self, event: &EventEnvelope) {
        self.publish_with(|_| event.clone()).await;
    }

    /// A separately built event per member.
    pub async fn publish_with<F>(&self, build: F)
    where
        F: Fn(i64) -> EventEnvelope,
    {
        let members = match self.pubsub.backend.room_members(self.table_id).await {
            Ok(members) => members,
            Err(err) => {
                warn!(table_id = self.table_id, error = %err, "Room lookup failed");
                return;
            }
        };

        let deliveries = members.into_iter().map(|player_id| {
            let event = build(player_id);
            async move { self.pubsub.to_player(player_id, &event).await }
        });
        join_all(deliveries).await;
    }

    pub async fn add(&self, player_id: i64) -> Result<bool, AppError> {
        self.pubsub.backend.add_to_room(self.table_id, player_id).await
    }

    pub async fn remove(&self, player_id: i64) -> Result<bool, AppError> {
        self.pubsub
            .backend
            .remove_from_room(self.table_id, player_id)
            .await
    }

    pub async fn contains(&self, player_id: i64) -> Result<bool, AppError> {
        self.pubsub.backend.is_member(self.table_id, player_id).await
    }

    /// Remove every member. Used once the table is finished.
    pub async fn close(&self) -> Result<(), AppError> {
        self.pubsub.backend.drop_room(self.table_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn room_publish_reaches_bound_members_only() {
        let backend = Arc::new(MemoryRealtime::new());
        let pubsub = PubSub::new(backend.clone());
        pubsub.bind("r1", 1).await.unwrap();
        pubsub.bind("r2", 2).await.unwrap();
        let room = pubsub.room(7);
        room.add(1).await.unwrap();
        room.add(2).await.unwrap();
        room.add(3).await.unwrap();

        room.publish(&EventEnvelope::PlayerJoined {
            table_id: 7,
            player_id: 3,
        })
        .await;

        assert_eq!(backend.delivered_to("r1").len(), 1);
        assert_eq!(backend.delivered_to("r2").len(), 1);
        assert_eq!(backend.delivered_to("r3").len(), 0);
    }

    #[tokio::test]
    async fn publish_with_builds_per_recipient() {
        let backend = Arc::new(MemoryRealtime::new());
        let pubsub = PubSub::new(backend.clone());
        for p in [1, 2] {
            pubsub.bind(&format!("r{p}"), p).await.unwrap();
            pubsub.room(1).add(p).await.unwrap();
        }

        pubsub
            .room(1)
            .publish_with(|player_id| EventEnvelope::PlayerLeaved {
                table_id: 1,
                player_id,
            })
            .await;

        let first = backend.delivered_to("r1");
        assert_eq!(first[0]["payload"]["player_id"], 1);
        let second = backend.delivered_to("r2");
        assert_eq!(second[0]["payload"]["player_id"], 2);
    }
}
