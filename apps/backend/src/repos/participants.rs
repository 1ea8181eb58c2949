//! Participant (seat) repository functions.

use sea_orm::ConnectionTrait;

use crate::adapters::participants_sea;
use crate::entities::participants;
use crate::errors::domain::DomainError;

pub use crate::entities::participants::ParticipantState;
pub use participants_sea::ParticipantUpdate;

impl ParticipantState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ParticipantState::Free => "FREE",
            ParticipantState::Busy => "BUSY",
            ParticipantState::Ready => "READY",
            ParticipantState::Disconnect => "DISCONNECT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: i64,
    pub table_id: i64,
    pub player_id: Option<i64>,
    /// Seat 1..=4.
    pub order: i16,
    pub state: ParticipantState,
}

impl Participant {
    pub fn is_free(&self) -> bool {
        self.state == ParticipantState::Free
    }

    /// Zero-based seat index as used in the signature.
    pub fn seat(&self) -> u8 {
        (self.order - 1).clamp(0, 3) as u8
    }
}

impl From<participants::Model> for Participant {
    fn from(model: participants::Model) -> Self {
        Self {
            id: model.id,
            table_id: model.table_id,
            player_id: model.player_id,
            order: model.seat_order,
            state: model.state,
        }
    }
}

pub async fn for_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<Vec<Participant>, DomainError> {
    let rows = participants_sea::find_all_by_table(conn, table_id).await?;
    Ok(rows.into_iter().map(Participant::from).collect())
}

pub async fn find_participant<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
) -> Result<Option<Participant>, DomainError> {
    let row = participants_sea::find_by_id(conn, id).await?;
    Ok(row.map(Participant::from))
}

pub async fn find_with_order<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
    order: i16,
) -> Result<Option<Participant>, DomainError> {
    let row = participants_sea::find_by_table_and_order(conn, table_id, order).await?;
    Ok(row.map(Participant::from))
}

pub async fn for_player_at_table<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
    player_id: i64,
) -> Result<Option<Participant>, DomainError> {
    let row = participants_sea::find_by_table_and_player(conn, table_id, player_id).await?;
    Ok(row.map(Participant::from))
}

pub async fn for_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    player_id: i64,
) -> Result<Vec<Participant>, DomainError> {
    let rows = participants_sea::find_all_by_player(conn, player_id).await?;
    Ok(rows.into_iter().map(Participant::from).collect())
}

/// Returns whether the seat was still FREE and is now taken.
pub async fn claim_seat<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
    player_id: i64,
) -> Result<bool, DomainError> {
    Ok(participants_sea::claim_seat(conn, id, player_id).await? == 1)
}

pub async fn update_participant<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: ParticipantUpdate,
) -> Result<(), DomainError> {
    participants_sea::update_participant(conn, dto).await?;
    Ok(())
}

pub async fn ready_count<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: i64,
) -> Result<usize, DomainError> {
    let count = participants_sea::count_in_state(conn, table_id, ParticipantState::Ready).await?;
    Ok(count as usize)
}
