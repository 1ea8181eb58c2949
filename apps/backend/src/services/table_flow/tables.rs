//! Lobby operations: creating, watching and sitting at tables.

use tracing::{debug, info};

use super::{TableDetails, TableFlowService};
use crate::error::AppError;
use crate::errors::domain::{
    ConflictKind, DomainError, InvalidStateKind, NotFoundKind, ValidationKind,
};
use crate::pubsub::EventEnvelope;
use crate::repos::{
    Currency, Participant, ParticipantState, ParticipantUpdate, TableCreate, SEAT_COUNT,
};
use crate::services::RequestContext;

impl TableFlowService {
    pub async fn create_table(
        &self,
        ctx: &RequestContext,
        bet: i64,
        currency: Currency,
    ) -> Result<TableDetails, AppError> {
        if bet < 0 {
            return Err(DomainError::validation(
                ValidationKind::InvalidPayload,
                format!("Bet must not be negative, got {bet}"),
            )
            .into());
        }

        let mut dto = TableCreate::new(bet, currency);
        if let Some(player_id) = ctx.player_id {
            dto = dto.by(player_id);
        }
        let (table, seats) = self.repo.create_table(dto).await?;
        info!(table_id = table.id, bet, currency = ?currency, "Table created");
        Ok(TableDetails::new(&table, &seats))
    }

    /// Subscribe the caller to the table's room, as spectator or player.
    pub async fn join_table(
        &self,
        ctx: &RequestContext,
        table_id: i64,
    ) -> Result<TableDetails, AppError> {
        let player_id = ctx.require_player()?;
        let table = self.require_table(table_id).await?;
        if table.end_time.is_some() {
            return Err(DomainError::conflict(
                ConflictKind::TableClosed,
                format!("Table {table_id} is finished"),
            )
            .into());
        }

        let room = self.pubsub.room(table_id);
        if !room.add(player_id).await? {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyJoined,
                format!("Player {player_id} already watches table {table_id}"),
            )
            .into());
        }
        room.publish(&EventEnvelope::PlayerJoined {
            table_id,
            player_id,
        })
        .await;

        let seats = self.repo.participants_for_table(table_id).await?;
        Ok(TableDetails::new(&table, &seats))
    }

    /// Leave the room; a seat at a table that has not started is freed.
    pub async fn leave_table(&self, ctx: &RequestContext, table_id: i64) -> Result<(), AppError> {
        let player_id = ctx.require_player()?;
        let status = self.require_status(table_id).await?;
        let room = self.pubsub.room(table_id);

        if !status.is_started() {
            if let Some(seat) = self.repo.participant_for_player(table_id, player_id).await? {
                self.repo
                    .update_participant(ParticipantUpdate::free(seat.id))
                    .await?;
                room.publish(&seat_changed(&seat, None, ParticipantState::Free))
                    .await;
            }
        }

        room.remove(player_id).await?;
        debug!(table_id, player_id, "Player left table");
        room.publish(&EventEnvelope::PlayerLeaved {
            table_id,
            player_id,
        })
        .await;
        Ok(())
    }

    /// Take seat `order` (1-based), or the first free seat when none is given.
    pub async fn become_participant(
        &self,
        ctx: &RequestContext,
        table_id: i64,
        order: Option<i16>,
    ) -> Result<TableDetails, AppError> {
        let player_id = ctx.require_player()?;
        let table = self.require_table(table_id).await?;
        if table.start_time.is_some() {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyStarted,
                format!("Table {table_id} already started"),
            )
            .into());
        }
        if self
            .repo
            .participant_for_player(table_id, player_id)
            .await?
            .is_some()
        {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyParticipant,
                format!("Player {player_id} already sits at table {table_id}"),
            )
            .into());
        }

        let seat = match order {
            Some(order) => self.requested_seat(table_id, order).await?,
            None => self
                .repo
                .participants_for_table(table_id)
                .await?
                .into_iter()
                .find(Participant::is_free)
                .ok_or_else(|| {
                    DomainError::invalid_state(
                        InvalidStateKind::NoEmptyPlaces,
                        format!("Table {table_id} has no free seat"),
                    )
                })?,
        };

        if !self.repo.claim_seat(seat.id, player_id).await? {
            return Err(seat_taken(seat.order, table_id));
        }
        info!(table_id, player_id, order = seat.order, "Seat taken");

        let room = self.pubsub.room(table_id);
        room.add(player_id).await?;
        room.publish(&seat_changed(&seat, Some(player_id), ParticipantState::Busy))
            .await;

        let seats = self.repo.participants_for_table(table_id).await?;
        Ok(TableDetails::new(&table, &seats))
    }

    async fn requested_seat(&self, table_id: i64, order: i16) -> Result<Participant, AppError> {
        if !(1..=SEAT_COUNT).contains(&order) {
            return Err(DomainError::validation(
                ValidationKind::InvalidSeat,
                format!("Seat {order} is outside 1..={SEAT_COUNT}"),
            )
            .into());
        }
        let seat = self
            .repo
            .find_participant_with_order(table_id, order)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(
                    NotFoundKind::Participant,
                    format!("Table {table_id} has no seat {order}"),
                )
            })?;
        if !seat.is_free() {
            return Err(seat_taken(order, table_id));
        }
        Ok(seat)
    }

    /// Tables without an end time, with their seats.
    pub async fn get_open_tables(&self) -> Result<Vec<TableDetails>, AppError> {
        let tables = self.repo.get_open_tables().await?;
        let mut details = Vec::with_capacity(tables.len());
        for table in &tables {
            let seats = self.repo.participants_for_table(table.id).await?;
            details.push(TableDetails::new(table, &seats));
        }
        Ok(details)
    }
}

fn seat_taken(order: i16, table_id: i64) -> AppError {
    DomainError::invalid_state(
        InvalidStateKind::ParticipantNotFree,
        format!("Seat {order} at table {table_id} is taken"),
    )
    .into()
}

pub(super) fn seat_changed(
    seat: &Participant,
    player_id: Option<i64>,
    state: ParticipantState,
) -> EventEnvelope {
    EventEnvelope::ParticipantStateChanged {
        table_id: seat.table_id,
        participant_id: seat.id,
        player_id,
        order: seat.order,
        state: state.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::errors::ErrorCode;
    use crate::repos::GameRepository;

    #[tokio::test]
    async fn create_table_opens_four_free_seats() {
        let h = Harness::new().await;
        let ctx = h.ctx(1).await;

        let table = h.flow.create_table(&ctx, 25, Currency::Gold).await.unwrap();

        assert_eq!(table.creator_id, ctx.player_id);
        assert_eq!(table.seats.len(), 4);
        assert!(table.seats.iter().all(|s| s.state == ParticipantState::Free));

        let err = h
            .flow
            .create_table(&ctx, -1, Currency::Gold)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPayload);
    }

    #[tokio::test]
    async fn join_twice_is_already_joined() {
        let h = Harness::new().await;
        let ctx = h.ctx(1).await;
        let table = h.flow.create_table(&ctx, 0, Currency::Nuts).await.unwrap();

        h.flow.join_table(&ctx, table.id).await.unwrap();
        assert_eq!(h.realtime.events_for("remote-1"), vec!["PlayerJoined"]);

        let err = h.flow.join_table(&ctx, table.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyJoined);
    }

    #[tokio::test]
    async fn become_participant_takes_first_free_seat() {
        let h = Harness::new().await;
        let table = h
            .flow
            .create_table(&h.ctx(1).await, 0, Currency::Nuts)
            .await
            .unwrap();

        let first = h
            .flow
            .become_participant(&h.ctx(1).await, table.id, Some(2))
            .await
            .unwrap();
        assert_eq!(first.seats[1].state, ParticipantState::Busy);

        let second = h
            .flow
            .become_participant(&h.ctx(2).await, table.id, None)
            .await
            .unwrap();
        assert_eq!(second.seats[0].player_id, Some(h.player(2).await));
        assert!(h.flow.pubsub().room(table.id).contains(h.player(2).await).await.unwrap());
    }

    #[tokio::test]
    async fn become_participant_guards() {
        let h = Harness::new().await;
        let table = h
            .flow
            .create_table(&h.ctx(1).await, 0, Currency::Nuts)
            .await
            .unwrap();
        h.flow
            .become_participant(&h.ctx(1).await, table.id, Some(1))
            .await
            .unwrap();

        let err = h
            .flow
            .become_participant(&h.ctx(1).await, table.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyParticipant);

        let err = h
            .flow
            .become_participant(&h.ctx(2).await, table.id, Some(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParticipantNotFree);

        let err = h
            .flow
            .become_participant(&h.ctx(2).await, table.id, Some(5))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSeat);

        for n in 2..=4 {
            h.flow
                .become_participant(&h.ctx(n).await, table.id, None)
                .await
                .unwrap();
        }
        let err = h
            .flow
            .become_participant(&h.ctx(5).await, table.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoEmptyPlaces);
    }

    #[tokio::test]
    async fn become_participant_after_start_is_rejected() {
        let h = Harness::new().await;
        let table_id = h.started_table().await;
        let err = h
            .flow
            .become_participant(&h.ctx(5).await, table_id, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyStarted);
    }

    #[tokio::test]
    async fn leave_before_start_frees_the_seat() {
        let h = Harness::new().await;
        let table_id = h.table_with_players(2).await;
        let ctx = h.ctx(2).await;

        h.flow.leave_table(&ctx, table_id).await.unwrap();

        let seat = h
            .repo
            .find_participant_with_order(table_id, 2)
            .await
            .unwrap()
            .unwrap();
        assert!(seat.is_free());
        assert_eq!(seat.player_id, None);
        assert!(!h.flow.pubsub().room(table_id).contains(ctx.player_id.unwrap()).await.unwrap());
        assert_eq!(
            h.realtime.events_for("remote-1"),
            vec!["ParticipantStateChanged", "PlayerLeaved"]
        );
    }

    #[tokio::test]
    async fn open_tables_skip_finished_ones() {
        let h = Harness::new().await;
        let finished = h.started_table().await;
        h.flow.finish_game(finished).await.unwrap();
        let open = h
            .flow
            .create_table(&h.ctx(1).await, 5, Currency::Usd)
            .await
            .unwrap();

        let tables = h.flow.get_open_tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].id, open.id);
        assert_eq!(tables[0].seats.len(), 4);
    }
}
