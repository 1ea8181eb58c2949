//! In-process repository for tests and single-process runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use super::{
    Deal, DealOrder, GameRepository, Participant, ParticipantState, ParticipantUpdate, Player,
    Round, Session, Table, TableCreate, TableStatus, TableUpdate, SEAT_COUNT,
};
use crate::errors::domain::{ConflictKind, DomainError};

#[derive(Default)]
struct Store {
    next_id: i64,
    tables: BTreeMap<i64, Table>,
    participants: BTreeMap<i64, Participant>,
    rounds: BTreeMap<i64, Round>,
    deals: BTreeMap<i64, Deal>,
    deal_orders: BTreeMap<i64, DealOrder>,
    players: BTreeMap<i64, Player>,
    sessions: BTreeMap<i64, Session>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn round_table(&self, round_id: i64) -> Option<i64> {
        self.rounds.get(&round_id).map(|r| r.table_id)
    }

    fn deal_table(&self, deal_id: i64) -> Option<i64> {
        self.deals
            .get(&deal_id)
            .and_then(|d| self.round_table(d.round_id))
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
    writes: AtomicU64,
    interleave: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call yields to the scheduler first, so concurrent callers on one
    /// runtime interleave between reads and writes the way they would
    /// against a database.
    pub fn interleaved() -> Self {
        Self {
            interleave: true,
            ..Self::default()
        }
    }

    async fn pause(&self) {
        if self.interleave {
            tokio::task::yield_now().await;
        }
    }

    /// Number of mutating calls made so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Every deal order ever created for a deal, oldest first.
    pub fn deal_orders_for_deal(&self, deal_id: i64) -> Vec<DealOrder> {
        self.store
            .lock()
            .deal_orders
            .values()
            .filter(|o| o.deal_id == deal_id)
            .cloned()
            .collect()
    }

    /// Every round of a table, oldest first.
    pub fn rounds_for_table(&self, table_id: i64) -> Vec<Round> {
        self.store
            .lock()
            .rounds
            .values()
            .filter(|r| r.table_id == table_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GameRepository for MemoryRepository {
    async fn find_table(&self, table_id: i64) -> Result<Option<Table>, DomainError> {
        self.pause().await;
        Ok(self.store.lock().tables.get(&table_id).cloned())
    }

    async fn table_status(&self, table_id: i64) -> Result<Option<TableStatus>, DomainError> {
        self.pause().await;
        Ok(self.store.lock().tables.get(&table_id).map(Table::status))
    }

    async fn update_table(&self, dto: TableUpdate) -> Result<bool, DomainError> {
        self.pause().await;
        if dto.is_empty() {
            return Ok(false);
        }
        let mut store = self.store.lock();
        let Some(table) = store.tables.get_mut(&dto.id) else {
            return Ok(false);
        };
        if (dto.start_time.is_some() && table.start_time.is_some())
            || (dto.end_time.is_some() && table.end_time.is_some())
        {
            return Ok(false);
        }

        if let Some(signature) = dto.signature {
            table.signature = signature;
        }
        if let Some(at) = dto.start_time {
            table.start_time = Some(at);
        }
        if let Some(at) = dto.end_time {
            table.end_time = Some(at);
        }
        self.wrote();
        Ok(true)
    }

    async fn create_table(
        &self,
        dto: TableCreate,
    ) -> Result<(Table, Vec<Participant>), DomainError> {
        self.pause().await;
        self.wrote();
        let mut store = self.store.lock();
        let table = Table {
            id: store.next_id(),
            creator_id: dto.creator_id,
            bet: dto.bet,
            currency: dto.currency,
            signature: String::new(),
            created_at: OffsetDateTime::now_utc(),
            start_time: None,
            end_time: None,
        };
        store.tables.insert(table.id, table.clone());

        let mut seats = Vec::with_capacity(SEAT_COUNT as usize);
        for order in 1..=SEAT_COUNT {
            let seat = Participant {
                id: store.next_id(),
                table_id: table.id,
                player_id: None,
                order,
                state: ParticipantState::Free,
            };
            store.participants.insert(seat.id, seat.clone());
            seats.push(seat);
        }
        Ok((table, seats))
    }

    async fn get_open_tables(&self) -> Result<Vec<Table>, DomainError> {
        self.pause().await;
        Ok(self
            .store
            .lock()
            .tables
            .values()
            .filter(|t| t.end_time.is_none())
            .cloned()
            .collect())
    }

    async fn participants_for_table(
        &self,
        table_id: i64,
    ) -> Result<Vec<Participant>, DomainError> {
        self.pause().await;
        let mut seats: Vec<Participant> = self
            .store
            .lock()
            .participants
            .values()
            .filter(|p| p.table_id == table_id)
            .cloned()
            .collect();
        seats.sort_by_key(|p| p.order);
        Ok(seats)
    }

    async fn find_participant(&self, id: i64) -> Result<Option<Participant>, DomainError> {
        self.pause().await;
        Ok(self.store.lock().participants.get(&id).cloned())
    }

    async fn find_participant_with_order(
        &self,
        table_id: i64,
        order: i16,
    ) -> Result<Option<Participant>, DomainError> {
        self.pause().await;
        Ok(self
            .store
            .lock()
            .participants
            .values()
            .find(|p| p.table_id == table_id && p.order == order)
            .cloned())
    }

    async fn participant_for_player(
        &self,
        table_id: i64,
        player_id: i64,
    ) -> Result<Option<Participant>, DomainError> {
        self.pause().await;
        Ok(self
            .store
            .lock()
            .participants
            .values()
            .find(|p| p.table_id == table_id && p.player_id == Some(player_id))
            .cloned())
    }

    async fn get_participants_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<Participant>, DomainError> {
        self.pause().await;
        Ok(self
            .store
            .lock()
            .participants
            .values()
            .filter(|p| p.player_id == Some(player_id))
            .cloned()
            .collect())
    }

    async fn claim_seat(&self, participant_id: i64, player_id: i64) -> Result<bool, DomainError> {
        self.pause().await;
        let mut store = self.store.lock();
        match store.participants.get_mut(&participant_id) {
            Some(seat) if seat.is_free() => {
                seat.state = ParticipantState::Busy;
                seat.player_id = Some(player_id);
                self.wrote();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_participant(&self, dto: ParticipantUpdate) -> Result<(), DomainError> {
        self.pause().await;
        self.wrote();
        let mut store = self.store.lock();
        if let Some(seat) = store.participants.get_mut(&dto.id) {
            if let Some(state) = dto.state {
                seat.state = state;
            }
            if let Some(player_id) = dto.player_id {
                seat.player_id = player_id;
            }
        }
        Ok(())
    }

    async fn table_ready_count(&self, table_id: i64) -> Result<usize, DomainError> {
        self.pause().await;
        Ok(self
            .store
            .lock()
            .participants
            .values()
            .filter(|p| p.table_id == table_id && p.state == ParticipantState::Ready)
            .count())
    }

    async fn find_current_round_for_table(
        &self,
        table_id: i64,
    ) -> Result<Option<Round>, DomainError> {
        self.pause().await;
        Ok(self
            .store
            .lock()
            .rounds
            .values()
            .rev()
            .find(|r| r.table_id == table_id && !r.is_closed())
            .cloned())
    }

    async fn find_round(&self, id: i64) -> Result<Option<Round>, DomainError> {
        self.pause().await;
        Ok(self.store.lock().rounds.get(&id).cloned())
    }

    async fn insert_round(&self, table_id: i64, signature: &str) -> Result<Round, DomainError> {
        self.pause().await;
        let mut store = self.store.lock();
        if let Some(open) = store
            .rounds
            .values()
            .find(|r| r.table_id == table_id && !r.is_closed())
        {
            return Err(DomainError::conflict(
                ConflictKind::RoundInProgress,
                format!("Round {} is still open", open.id),
            ));
        }
        self.wrote();
        let round = Round {
            id: store.next_id(),
            table_id,
            signature: signature.to_string(),
            start_time: OffsetDateTime::now_utc(),
            end_time: None,
        };
        store.rounds.insert(round.id, round.clone());
        Ok(round)
    }

    async fn close_round(&self, id: i64) -> Result<bool, DomainError> {
        self.pause().await;
        let mut store = self.store.lock();
        match store.rounds.get_mut(&id) {
            Some(round) if !round.is_closed() => {
                round.end_time = Some(OffsetDateTime::now_utc());
                self.wrote();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_current_deal_for_table(
        &self,
        table_id: i64,
    ) -> Result<Option<Deal>, DomainError> {
        self.pause().await;
        let store = self.store.lock();
        Ok(store
            .deals
            .values()
            .rev()
            .find(|d| !d.is_closed() && store.round_table(d.round_id) == Some(table_id))
            .cloned())
    }

    async fn find_deal(&self, id: i64) -> Result<Option<Deal>, DomainError> {
        self.pause().await;
        Ok(self.store.lock().deals.get(&id).cloned())
    }

    async fn insert_deal(&self, round_id: i64, signature: &str) -> Result<Deal, DomainError> {
        self.pause().await;
        let mut store = self.store.lock();
        if let Some(open) = store
            .deals
            .values()
            .find(|d| d.round_id == round_id && !d.is_closed())
        {
            return Err(DomainError::conflict(
                ConflictKind::DealInProgress,
                format!("Deal {} is still open", open.id),
            ));
        }
        self.wrote();
        let deal = Deal {
            id: store.next_id(),
            round_id,
            signature: signature.to_string(),
            start_time: OffsetDateTime::now_utc(),
            end_time: None,
        };
        store.deals.insert(deal.id, deal.clone());
        Ok(deal)
    }

    async fn close_deal(&self, id: i64) -> Result<bool, DomainError> {
        self.pause().await;
        let mut store = self.store.lock();
        match store.deals.get_mut(&id) {
            Some(deal) if !deal.is_closed() => {
                deal.end_time = Some(OffsetDateTime::now_utc());
                self.wrote();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_current_deal_order_for_table(
        &self,
        table_id: i64,
    ) -> Result<Option<DealOrder>, DomainError> {
        self.pause().await;
        let store = self.store.lock();
        Ok(store
            .deal_orders
            .values()
            .rev()
            .find(|o| !o.is_closed() && store.deal_table(o.deal_id) == Some(table_id))
            .cloned())
    }

    async fn insert_deal_order(
        &self,
        deal_id: i64,
        participant_id: i64,
    ) -> Result<DealOrder, DomainError> {
        self.pause().await;
        let mut store = self.store.lock();
        if let Some(open) = store
            .deal_orders
            .values()
            .find(|o| o.deal_id == deal_id && !o.is_closed())
        {
            return Err(DomainError::conflict(
                ConflictKind::MoveInProgress,
                format!("Participant {} has not moved yet", open.participant_id),
            ));
        }
        self.wrote();
        let order = DealOrder {
            id: store.next_id(),
            deal_id,
            participant_id,
            signature: String::new(),
            start_time: OffsetDateTime::now_utc(),
            end_time: None,
        };
        store.deal_orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn close_deal_order(&self, id: i64, card: &str) -> Result<bool, DomainError> {
        self.pause().await;
        let mut store = self.store.lock();
        match store.deal_orders.get_mut(&id) {
            Some(order) if !order.is_closed() => {
                order.signature = card.to_string();
                order.end_time = Some(OffsetDateTime::now_utc());
                self.wrote();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn select_or_insert_player(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Player, DomainError> {
        self.pause().await;
        let mut store = self.store.lock();
        if let Some(existing) = store.players.values().find(|p| p.user_id == user_id) {
            return Ok(existing.clone());
        }
        self.wrote();
        let player = Player {
            id: store.next_id(),
            user_id: user_id.to_string(),
            name: name.to_string(),
        };
        store.players.insert(player.id, player.clone());
        Ok(player)
    }

    async fn find_player(&self, id: i64) -> Result<Option<Player>, DomainError> {
        self.pause().await;
        Ok(self.store.lock().players.get(&id).cloned())
    }

    async fn create_session(&self, player_id: i64, remote: &str) -> Result<Session, DomainError> {
        self.pause().await;
        self.wrote();
        let mut store = self.store.lock();
        let session = Session {
            id: store.next_id(),
            remote: remote.to_string(),
            player_id,
            created_at: OffsetDateTime::now_utc(),
            closed_at: None,
        };
        store.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_opened_session_for_remote(
        &self,
        remote: &str,
    ) -> Result<Option<Session>, DomainError> {
        self.pause().await;
        Ok(self
            .store
            .lock()
            .sessions
            .values()
            .rev()
            .find(|s| s.remote == remote && s.closed_at.is_none())
            .cloned())
    }

    async fn opened_sessions_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<Session>, DomainError> {
        self.pause().await;
        Ok(self
            .store
            .lock()
            .sessions
            .values()
            .filter(|s| s.player_id == player_id && s.closed_at.is_none())
            .cloned()
            .collect())
    }

    async fn close_session(&self, id: i64) -> Result<bool, DomainError> {
        self.pause().await;
        let mut store = self.store.lock();
        match store.sessions.get_mut(&id) {
            Some(session) if session.closed_at.is_none() => {
                session.closed_at = Some(OffsetDateTime::now_utc());
                self.wrote();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::Currency;

    #[tokio::test]
    async fn create_table_seats_four_free_participants() {
        let repo = MemoryRepository::new();
        let (table, seats) = repo
            .create_table(TableCreate::new(10, Currency::Nuts))
            .await
            .unwrap();
        assert_eq!(seats.len(), 4);
        assert!(seats.iter().all(Participant::is_free));
        assert_eq!(
            seats.iter().map(|s| s.order).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        assert_eq!(repo.get_open_tables().await.unwrap(), vec![table]);
    }

    #[tokio::test]
    async fn seat_claim_is_conditional() {
        let repo = MemoryRepository::new();
        let (_, seats) = repo
            .create_table(TableCreate::new(0, Currency::Gold))
            .await
            .unwrap();
        assert!(repo.claim_seat(seats[0].id, 7).await.unwrap());
        assert!(!repo.claim_seat(seats[0].id, 8).await.unwrap());
        let seat = repo.find_participant(seats[0].id).await.unwrap().unwrap();
        assert_eq!(seat.player_id, Some(7));
        assert_eq!(seat.state, ParticipantState::Busy);
    }

    #[tokio::test]
    async fn current_deal_order_is_resolved_through_round() {
        let repo = MemoryRepository::new();
        let (table, seats) = repo
            .create_table(TableCreate::new(0, Currency::Usd))
            .await
            .unwrap();
        let round = repo.insert_round(table.id, "").await.unwrap();
        let deal = repo.insert_deal(round.id, "").await.unwrap();
        let order = repo.insert_deal_order(deal.id, seats[2].id).await.unwrap();

        assert_eq!(
            repo.find_current_deal_order_for_table(table.id)
                .await
                .unwrap(),
            Some(order.clone())
        );
        assert!(repo.close_deal_order(order.id, "50").await.unwrap());
        assert!(!repo.close_deal_order(order.id, "50").await.unwrap());
        assert!(repo
            .find_current_deal_order_for_table(table.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn second_open_round_deal_or_order_is_a_conflict() {
        let repo = MemoryRepository::new();
        let (table, seats) = repo
            .create_table(TableCreate::new(0, Currency::Nuts))
            .await
            .unwrap();
        let round = repo.insert_round(table.id, "").await.unwrap();
        let err = repo.insert_round(table.id, "").await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::RoundInProgress, _)
        ));

        let deal = repo.insert_deal(round.id, "").await.unwrap();
        let err = repo.insert_deal(round.id, "").await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::DealInProgress, _)
        ));

        let order = repo.insert_deal_order(deal.id, seats[0].id).await.unwrap();
        let err = repo
            .insert_deal_order(deal.id, seats[1].id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::MoveInProgress, _)
        ));
        assert_eq!(repo.deal_orders_for_deal(deal.id), vec![order.clone()]);

        assert!(repo.close_deal_order(order.id, "50").await.unwrap());
        repo.insert_deal_order(deal.id, seats[1].id).await.unwrap();
        assert!(repo.close_round(round.id).await.unwrap());
        repo.insert_round(table.id, "").await.unwrap();
        assert_eq!(repo.rounds_for_table(table.id).len(), 2);
    }

    #[tokio::test]
    async fn lifecycle_stamps_are_written_once() {
        let repo = MemoryRepository::new();
        let (table, _) = repo
            .create_table(TableCreate::new(0, Currency::Nuts))
            .await
            .unwrap();
        let first = OffsetDateTime::now_utc();
        let later = first + time::Duration::seconds(5);

        assert!(repo
            .update_table(TableUpdate::new(table.id).with_start_time(first))
            .await
            .unwrap());
        assert!(!repo
            .update_table(TableUpdate::new(table.id).with_start_time(later))
            .await
            .unwrap());
        assert!(repo
            .update_table(TableUpdate::new(table.id).with_signature("sig"))
            .await
            .unwrap());
        assert!(repo
            .update_table(TableUpdate::new(table.id).with_end_time(later))
            .await
            .unwrap());
        assert!(!repo
            .update_table(TableUpdate::new(table.id).with_end_time(first))
            .await
            .unwrap());
        assert!(!repo
            .update_table(TableUpdate::new(table.id + 100).with_signature("sig"))
            .await
            .unwrap());

        let status = repo.table_status(table.id).await.unwrap().unwrap();
        assert_eq!(status.start_time, Some(first));
        assert_eq!(status.end_time, Some(later));
        assert_eq!(status.signature, "sig");
    }
}
