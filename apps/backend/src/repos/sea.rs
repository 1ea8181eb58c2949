//! Postgres-backed repository.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, TransactionTrait};

use super::{
    participants, players, rounds, tables, Deal, DealOrder, GameRepository, Participant,
    ParticipantUpdate, Player, Round, Session, Table, TableCreate, TableStatus, TableUpdate,
};
use crate::errors::domain::DomainError;

#[derive(Clone)]
pub struct SeaRepository {
    db: DatabaseConnection,
}

impl SeaRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl GameRepository for SeaRepository {
    async fn find_table(&self, table_id: i64) -> Result<Option<Table>, DomainError> {
        tables::find_table(&self.db, table_id).await
    }

    async fn table_status(&self, table_id: i64) -> Result<Option<TableStatus>, DomainError> {
        tables::table_status(&self.db, table_id).await
    }

    async fn update_table(&self, dto: TableUpdate) -> Result<bool, DomainError> {
        tables::update_table(&self.db, dto).await
    }

    async fn create_table(
        &self,
        dto: TableCreate,
    ) -> Result<(Table, Vec<Participant>), DomainError> {
        let txn = self.db.begin().await?;
        let created = tables::create_table(&txn, dto).await?;
        txn.commit().await?;
        Ok(created)
    }

    async fn get_open_tables(&self) -> Result<Vec<Table>, DomainError> {
        tables::open_tables(&self.db).await
    }

    async fn participants_for_table(
        &self,
        table_id: i64,
    ) -> Result<Vec<Participant>, DomainError> {
        participants::for_table(&self.db, table_id).await
    }

    async fn find_participant(&self, id: i64) -> Result<Option<Participant>, DomainError> {
        participants::find_participant(&self.db, id).await
    }

    async fn find_participant_with_order(
        &self,
        table_id: i64,
        order: i16,
    ) -> Result<Option<Participant>, DomainError> {
        participants::find_with_order(&self.db, table_id, order).await
    }

    async fn participant_for_player(
        &self,
        table_id: i64,
        player_id: i64,
    ) -> Result<Option<Participant>, DomainError> {
        participants::for_player_at_table(&self.db, table_id, player_id).await
    }

    async fn get_participants_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<Participant>, DomainError> {
        participants::for_player(&self.db, player_id).await
    }

    async fn claim_seat(&self, participant_id: i64, player_id: i64) -> Result<bool, DomainError> {
        participants::claim_seat(&self.db, participant_id, player_id).await
    }

    async fn update_participant(&self, dto: ParticipantUpdate) -> Result<(), DomainError> {
        participants::update_participant(&self.db, dto).await
    }

    async fn table_ready_count(&self, table_id: i64) -> Result<usize, DomainError> {
        participants::ready_count(&self.db, table_id).await
    }

    async fn find_current_round_for_table(
        &self,
        table_id: i64,
    ) -> Result<Option<Round>, DomainError> {
        rounds::current_round(&self.db, table_id).await
    }

    async fn find_round(&self, id: i64) -> Result<Option<Round>, DomainError> {
        rounds::find_round(&self.db, id).await
    }

    async fn insert_round(&self, table_id: i64, signature: &str) -> Result<Round, DomainError> {
        rounds::insert_round(&self.db, table_id, signature).await
    }

    async fn close_round(&self, id: i64) -> Result<bool, DomainError> {
        rounds::close_round(&self.db, id).await
    }

    async fn find_current_deal_for_table(
        &self,
        table_id: i64,
    ) -> Result<Option<Deal>, DomainError> {
        rounds::current_deal(&self.db, table_id).await
    }

    async fn find_deal(&self, id: i64) -> Result<Option<Deal>, DomainError> {
        rounds::find_deal(&self.db, id).await
    }

    async fn insert_deal(&self, round_id: i64, signature: &str) -> Result<Deal, DomainError> {
        rounds::insert_deal(&self.db, round_id, signature).await
    }

    async fn close_deal(&self, id: i64) -> Result<bool, DomainError> {
        rounds::close_deal(&self.db, id).await
    }

    async fn find_current_deal_order_for_table(
        &self,
        table_id: i64,
    ) -> Result<Option<DealOrder>, DomainError> {
        rounds::current_deal_order(&self.db, table_id).await
    }

    async fn insert_deal_order(
        &self,
        deal_id: i64,
        participant_id: i64,
    ) -> Result<DealOrder, DomainError> {
        rounds::insert_deal_order(&self.db, deal_id, participant_id).await
    }

    async fn close_deal_order(&self, id: i64, card: &str) -> Result<bool, DomainError> {
        rounds::close_deal_order(&self.db, id, card).await
    }

    async fn select_or_insert_player(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Player, DomainError> {
        players::select_or_insert_player(&self.db, user_id, name).await
    }

    async fn find_player(&self, id: i64) -> Result<Option<Player>, DomainError> {
        players::find_player(&self.db, id).await
    }

    async fn create_session(&self, player_id: i64, remote: &str) -> Result<Session, DomainError> {
        players::create_session(&self.db, player_id, remote).await
    }

    async fn get_opened_session_for_remote(
        &self,
        remote: &str,
    ) -> Result<Option<Session>, DomainError> {
        players::open_session_for_remote(&self.db, remote).await
    }

    async fn opened_sessions_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<Session>, DomainError> {
        players::open_sessions_for_player(&self.db, player_id).await
    }

    async fn close_session(&self, id: i64) -> Result<bool, DomainError> {
        players::close_session(&self.db, id).await
    }
}
