//! Persistence boundary for the table family.
//!
//! Free functions per entity are generic over a sea-orm connection; the
//! [`GameRepository`] trait bundles them for the orchestrator so that tests
//! can run against [`memory::MemoryRepository`].

use async_trait::async_trait;

use crate::errors::domain::DomainError;

pub mod memory;
pub mod participants;
pub mod players;
pub mod rounds;
pub mod sea;
pub mod tables;

pub use memory::MemoryRepository;
pub use participants::{Participant, ParticipantState, ParticipantUpdate};
pub use players::{Player, Session};
pub use rounds::{Deal, DealOrder, Round};
pub use sea::SeaRepository;
pub use tables::{Currency, Table, TableCreate, TableStatus, TableUpdate, SEAT_COUNT};

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn find_table(&self, table_id: i64) -> Result<Option<Table>, DomainError>;

    /// Start, end and signature only.
    async fn table_status(&self, table_id: i64) -> Result<Option<TableStatus>, DomainError>;

    /// False if nothing matched: an unknown table, or a start/end time that
    /// is already set.
    async fn update_table(&self, dto: TableUpdate) -> Result<bool, DomainError>;

    /// Table plus its four FREE seats, created atomically.
    async fn create_table(
        &self,
        dto: TableCreate,
    ) -> Result<(Table, Vec<Participant>), DomainError>;

    /// Tables without an end time.
    async fn get_open_tables(&self) -> Result<Vec<Table>, DomainError>;

    /// Seats ordered by seat number.
    async fn participants_for_table(&self, table_id: i64)
        -> Result<Vec<Participant>, DomainError>;

    async fn find_participant(&self, id: i64) -> Result<Option<Participant>, DomainError>;

    async fn find_participant_with_order(
        &self,
        table_id: i64,
        order: i16,
    ) -> Result<Option<Participant>, DomainError>;

    async fn participant_for_player(
        &self,
        table_id: i64,
        player_id: i64,
    ) -> Result<Option<Participant>, DomainError>;

    async fn get_participants_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<Participant>, DomainError>;

    /// FREE -> BUSY for `player_id`. False if the seat was no longer FREE.
    async fn claim_seat(&self, participant_id: i64, player_id: i64) -> Result<bool, DomainError>;

    async fn update_participant(&self, dto: ParticipantUpdate) -> Result<(), DomainError>;

    async fn table_ready_count(&self, table_id: i64) -> Result<usize, DomainError>;

    async fn find_current_round_for_table(
        &self,
        table_id: i64,
    ) -> Result<Option<Round>, DomainError>;

    async fn find_round(&self, id: i64) -> Result<Option<Round>, DomainError>;

    async fn insert_round(&self, table_id: i64, signature: &str) -> Result<Round, DomainError>;

    /// False if the round was already closed.
    async fn close_round(&self, id: i64) -> Result<bool, DomainError>;

    async fn find_current_deal_for_table(&self, table_id: i64)
        -> Result<Option<Deal>, DomainError>;

    async fn find_deal(&self, id: i64) -> Result<Option<Deal>, DomainError>;

    async fn insert_deal(&self, round_id: i64, signature: &str) -> Result<Deal, DomainError>;

    async fn close_deal(&self, id: i64) -> Result<bool, DomainError>;

    async fn find_current_deal_order_for_table(
        &self,
        table_id: i64,
    ) -> Result<Option<DealOrder>, DomainError>;

    async fn insert_deal_order(
        &self,
        deal_id: i64,
        participant_id: i64,
    ) -> Result<DealOrder, DomainError>;

    /// Record `card` and close the order. False if it was already closed.
    async fn close_deal_order(&self, id: i64, card: &str) -> Result<bool, DomainError>;

    async fn select_or_insert_player(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Player, DomainError>;

    async fn find_player(&self, id: i64) -> Result<Option<Player>, DomainError>;

    async fn create_session(&self, player_id: i64, remote: &str) -> Result<Session, DomainError>;

    async fn get_opened_session_for_remote(
        &self,
        remote: &str,
    ) -> Result<Option<Session>, DomainError>;

    async fn opened_sessions_for_player(&self, player_id: i64)
        -> Result<Vec<Session>, DomainError>;

    async fn close_session(&self, id: i64) -> Result<bool, DomainError>;
}
