//! Event envelopes pushed to clients.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub participant_id: i64,
    pub player_id: Option<i64>,
    pub name: Option<String>,
    pub order: i16,
    pub state: String,
    /// Hex card run; blank for every seat but the recipient's own.
    pub cards: String,
    pub cards_count: usize,
}

/// Table snapshot as seen by one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    pub id: i64,
    pub trump: u8,
    pub turn: u8,
    pub table_cards: String,
    pub club_player: Option<u8>,
    pub dealer: u8,
    pub team_1_score: u32,
    pub team_2_score: u32,
    pub team_1_total: u32,
    pub team_2_total: u32,
    pub players: Vec<SeatView>,
}

impl TableView {
    /// Copy in which only `player_id`'s own seat keeps its cards.
    pub fn redacted_for(&self, player_id: i64) -> TableView {
        let mut view = self.clone();
        for seat in &mut view.players {
            if seat.player_id != Some(player_id) {
                seat.cards.clear();
            }
        }
        view
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum EventEnvelope {
    GameStarted {
        table_id: i64,
        start_time: String,
        players: Vec<i64>,
    },
    RoundStarted {
        round_id: i64,
        table: TableView,
    },
    DealFinished {
        table_id: i64,
        deal_id: i64,
        team_1_score: u32,
        team_2_score: u32,
    },
    WaitForMove {
        table_id: i64,
        participant_id: i64,
        player_id: Option<i64>,
        order: i16,
    },
    PlayerMoved {
        table_id: i64,
        player_id: i64,
        card: String,
        order: i16,
    },
    RoundFinished {
        table_id: i64,
        round_id: i64,
        team_1_total: u32,
        team_2_total: u32,
    },
    GameFinished {
        table_id: i64,
        end_time: String,
        team_1_total: u32,
        team_2_total: u32,
        winner_team: Option<u8>,
    },
    PlayerJoined {
        table_id: i64,
        player_id: i64,
    },
    PlayerLeaved {
        table_id: i64,
        player_id: i64,
    },
    ParticipantStateChanged {
        table_id: i64,
        participant_id: i64,
        player_id: Option<i64>,
        order: i16,
        state: String,
    },
    CloseSession {
        session_id: i64,
        player_id: i64,
    },
    /// Reconnect snapshot, redacted for the recipient.
    TableSnapshot {
        table: TableView,
    },
}

impl EventEnvelope {
    pub fn name(&self) -> &'static str {
        match self {
            EventEnvelope::GameStarted { .. } => "GameStarted",
            EventEnvelope::RoundStarted { .. } => "RoundStarted",
            EventEnvelope::DealFinished { .. } => "DealFinished",
            EventEnvelope::WaitForMove { .. } => "WaitForMove",
            EventEnvelope::PlayerMoved { .. } => "PlayerMoved",
            EventEnvelope::RoundFinished { .. } => "RoundFinished",
            EventEnvelope::GameFinished { .. } => "GameFinished",
            EventEnvelope::PlayerJoined { .. } => "PlayerJoined",
            EventEnvelope::PlayerLeaved { .. } => "PlayerLeaved",
            EventEnvelope::ParticipantStateChanged { .. } => "ParticipantStateChanged",
            EventEnvelope::CloseSession { .. } => "CloseSession",
            EventEnvelope::TableSnapshot { .. } => "TableSnapshot",
        }
    }
}
