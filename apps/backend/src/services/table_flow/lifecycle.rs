//! Stage handlers driven by the task queue.

use time::OffsetDateTime;
use tracing::{debug, info};

use super::{ensure_open, parse_id, parse_signature, rfc3339, TableFlowService};
use crate::dispatch::Stage;
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError, InvalidStateKind, NotFoundKind};
use crate::pubsub::EventEnvelope;
use crate::repos::{TableUpdate, SEAT_COUNT};

impl TableFlowService {
    /// START_GAME: stamp the start time once four seats are READY.
    pub(crate) async fn start_game(&self, table_id: i64, payload: &str) -> Result<(), AppError> {
        let status = self.require_status(table_id).await?;
        if status.is_started() {
            return Err(already_started(table_id));
        }

        let ready = self.repo.table_ready_count(table_id).await?;
        if ready < SEAT_COUNT as usize {
            return Err(DomainError::invalid_state(
                InvalidStateKind::NotEnoughPlayers,
                format!("Table {table_id} has {ready} ready players"),
            )
            .into());
        }

        let players = seated_players(payload)?;
        let now = OffsetDateTime::now_utc();
        if !self
            .repo
            .update_table(TableUpdate::new(table_id).with_start_time(now))
            .await?
        {
            return Err(already_started(table_id));
        }
        info!(table_id, players = ?players, "Game started");

        self.pubsub
            .room(table_id)
            .publish(&EventEnvelope::GameStarted {
                table_id,
                start_time: rfc3339(now),
                players,
            })
            .await;
        self.schedule(Stage::StartRound, table_id, "").await
    }

    /// START_ROUND: deal a fresh round and show each player their own hand.
    pub(crate) async fn start_round(&self, table_id: i64) -> Result<(), AppError> {
        let status = self.require_status(table_id).await?;
        ensure_open(table_id, &status)?;

        if let Some(round) = self.repo.find_current_round_for_table(table_id).await? {
            return Err(DomainError::conflict(
                ConflictKind::RoundInProgress,
                format!("Round {} is still open", round.id),
            )
            .into());
        }

        // the open round row is the claim; the signature is written after it
        let signature = self.engine.new_round(&status.signature).await?;
        let round = self.repo.insert_round(table_id, &signature).await?;
        self.repo
            .update_table(TableUpdate::new(table_id).with_signature(signature.clone()))
            .await?;
        info!(table_id, round_id = round.id, "Round started");

        let view = self.table_view(table_id, &signature).await?;
        self.pubsub
            .room(table_id)
            .publish_with(|player_id| EventEnvelope::RoundStarted {
                round_id: round.id,
                table: view.redacted_for(player_id),
            })
            .await;
        self.schedule(Stage::StartDeal, table_id, "").await
    }

    /// START_DEAL: open a deal (one trick) in the current round.
    pub(crate) async fn start_deal(&self, table_id: i64) -> Result<(), AppError> {
        let status = self.require_status(table_id).await?;
        ensure_open(table_id, &status)?;

        let round = self
            .repo
            .find_current_round_for_table(table_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(
                    NotFoundKind::Round,
                    format!("Table {table_id} has no open round"),
                )
            })?;

        if let Some(deal) = self.repo.find_current_deal_for_table(table_id).await? {
            return Err(DomainError::conflict(
                ConflictKind::DealInProgress,
                format!("Deal {} is still open", deal.id),
            )
            .into());
        }

        let deal = self.repo.insert_deal(round.id, &status.signature).await?;
        debug!(table_id, round_id = round.id, deal_id = deal.id, "Deal started");
        self.schedule(Stage::NextMove, table_id, "").await
    }

    /// NEXT_MOVE: open a turn for the seat the signature points at.
    pub(crate) async fn next_move(&self, table_id: i64) -> Result<(), AppError> {
        let status = self.require_status(table_id).await?;
        ensure_open(table_id, &status)?;

        let deal = self
            .repo
            .find_current_deal_for_table(table_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(
                    NotFoundKind::Deal,
                    format!("Table {table_id} has no open deal"),
                )
            })?;

        if let Some(order) = self.repo.find_current_deal_order_for_table(table_id).await? {
            return Err(DomainError::conflict(
                ConflictKind::MoveInProgress,
                format!("Seat of participant {} has not moved yet", order.participant_id),
            )
            .into());
        }

        let sig = parse_signature(&status.signature)?;
        let order = sig.turn_order();
        let participant = self
            .repo
            .find_participant_with_order(table_id, order)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(
                    NotFoundKind::Participant,
                    format!("Table {table_id} has no seat {order}"),
                )
            })?;

        self.repo.insert_deal_order(deal.id, participant.id).await?;
        debug!(table_id, deal_id = deal.id, order, "Waiting for move");

        self.pubsub
            .room(table_id)
            .publish(&EventEnvelope::WaitForMove {
                table_id,
                participant_id: participant.id,
                player_id: participant.player_id,
                order,
            })
            .await;
        Ok(())
    }

    /// FINISH_DEAL: close the trick and either deal the next one or end the
    /// round once every hand is empty.
    pub(crate) async fn finish_deal(&self, table_id: i64, deal_id: i64) -> Result<(), AppError> {
        let deal = self.repo.find_deal(deal_id).await?.ok_or_else(|| {
            DomainError::not_found(NotFoundKind::Deal, format!("Deal {deal_id} not found"))
        })?;
        if deal.is_closed() || !self.repo.close_deal(deal_id).await? {
            return Err(deal_closed(deal_id));
        }

        let status = self.require_status(table_id).await?;
        let sig = parse_signature(&status.signature)?;
        debug!(table_id, deal_id, scores = ?sig.round_scores, "Deal finished");

        self.pubsub
            .room(table_id)
            .publish(&EventEnvelope::DealFinished {
                table_id,
                deal_id,
                team_1_score: sig.round_scores[0],
                team_2_score: sig.round_scores[1],
            })
            .await;

        if sig.is_round_finished() {
            self.schedule(Stage::FinishRound, table_id, deal.round_id.to_string())
                .await
        } else {
            self.schedule(Stage::StartDeal, table_id, "").await
        }
    }

    /// FINISH_ROUND: close the round and either deal again or end the game.
    pub(crate) async fn finish_round(&self, table_id: i64, round_id: i64) -> Result<(), AppError> {
        let round = self.repo.find_round(round_id).await?.ok_or_else(|| {
            DomainError::not_found(NotFoundKind::Round, format!("Round {round_id} not found"))
        })?;
        if round.is_closed() || !self.repo.close_round(round_id).await? {
            return Err(DomainError::conflict(
                ConflictKind::RoundClosed,
                format!("Round {round_id} is already closed"),
            )
            .into());
        }

        let status = self.require_status(table_id).await?;
        let sig = parse_signature(&status.signature)?;
        info!(table_id, round_id, totals = ?sig.totals, "Round finished");

        self.pubsub
            .room(table_id)
            .publish(&EventEnvelope::RoundFinished {
                table_id,
                round_id,
                team_1_total: sig.totals[0],
                team_2_total: sig.totals[1],
            })
            .await;

        if sig.is_game_finished() {
            self.schedule(Stage::FinishGame, table_id, "").await
        } else {
            self.schedule(Stage::StartRound, table_id, "").await
        }
    }

    /// FINISH_GAME: stamp the end time. Terminal.
    pub(crate) async fn finish_game(&self, table_id: i64) -> Result<(), AppError> {
        let status = self.require_status(table_id).await?;
        if status.is_closed() {
            return Err(table_finished(table_id));
        }
        ensure_open(table_id, &status)?;

        let sig = parse_signature(&status.signature)?;
        let now = OffsetDateTime::now_utc();
        if !self
            .repo
            .update_table(TableUpdate::new(table_id).with_end_time(now))
            .await?
        {
            return Err(table_finished(table_id));
        }
        let winner_team = sig.winning_team().map(|team| team as u8 + 1);
        info!(table_id, winner_team = ?winner_team, "Game finished");

        let room = self.pubsub.room(table_id);
        room.publish(&EventEnvelope::GameFinished {
            table_id,
            end_time: rfc3339(now),
            team_1_total: sig.totals[0],
            team_2_total: sig.totals[1],
            winner_team,
        })
        .await;
        room.close().await
    }
}

fn already_started(table_id: i64) -> AppError {
    DomainError::conflict(
        ConflictKind::AlreadyStarted,
        format!("Table {table_id} already started"),
    )
    .into()
}

fn table_finished(table_id: i64) -> AppError {
    DomainError::conflict(
        ConflictKind::TableClosed,
        format!("Table {table_id} is already finished"),
    )
    .into()
}

fn deal_closed(deal_id: i64) -> AppError {
    DomainError::conflict(
        ConflictKind::DealClosed,
        format!("Deal {deal_id} is already closed"),
    )
    .into()
}

/// Player ids from the ready trigger payload, in seat order.
fn seated_players(payload: &str) -> Result<Vec<i64>, AppError> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    payload
        .split(',')
        .map(|id| parse_id(id.trim(), "player id"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::testing::Harness;
    use super::*;
    use crate::engine::Signature;
    use crate::errors::ErrorCode;
    use crate::repos::GameRepository;

    #[test]
    fn ready_payload_lists_players_in_order() {
        assert_eq!(seated_players("4,2,9,1").unwrap(), vec![4, 2, 9, 1]);
        assert!(seated_players("").unwrap().is_empty());
        assert_eq!(
            seated_players("4,x").unwrap_err().code(),
            ErrorCode::InvalidPayload
        );
    }

    #[tokio::test]
    async fn start_game_needs_four_ready_seats() {
        let h = Harness::new().await;
        let table_id = h.table_with_players(3).await;

        let err = h.flow.start_game(table_id, "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotEnoughPlayers);
        assert!(!h.repo.table_status(table_id).await.unwrap().unwrap().is_started());
    }

    #[tokio::test]
    async fn start_game_twice_is_rejected() {
        let h = Harness::new().await;
        let table_id = h.ready_table().await;

        h.flow.start_game(table_id, "").await.unwrap();
        let err = h.flow.start_game(table_id, "").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyStarted);
    }

    #[tokio::test]
    async fn start_round_requires_started_table() {
        let h = Harness::new().await;
        let table_id = h.ready_table().await;

        let err = h.flow.start_round(table_id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TableNotStarted);
    }

    #[tokio::test]
    async fn second_start_round_sees_open_round() {
        let h = Harness::new().await;
        let table_id = h.started_table().await;

        h.flow.start_round(table_id).await.unwrap();
        let writes = h.repo.write_count();
        let err = h.flow.start_round(table_id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RoundInProgress);
        assert_eq!(h.repo.write_count(), writes);
    }

    #[tokio::test]
    async fn start_deal_without_round_is_not_found() {
        let h = Harness::new().await;
        let table_id = h.started_table().await;

        let err = h.flow.start_deal(table_id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RoundNotFound);
    }

    #[tokio::test]
    async fn next_move_opens_turn_for_the_seat_after_dealer() {
        let h = Harness::new().await;
        let table_id = h.started_table().await;
        h.flow.start_round(table_id).await.unwrap();
        h.flow.start_deal(table_id).await.unwrap();
        h.flow.next_move(table_id).await.unwrap();

        let sig: Signature = h
            .repo
            .table_status(table_id)
            .await
            .unwrap()
            .unwrap()
            .signature
            .parse()
            .unwrap();
        let order = h
            .repo
            .find_current_deal_order_for_table(table_id)
            .await
            .unwrap()
            .unwrap();
        let seat = h
            .repo
            .find_participant(order.participant_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seat.order, sig.turn_order());
        assert_eq!(sig.turn, (sig.dealer + 1) % 4);

        let err = h.flow.next_move(table_id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MoveInProgress);
    }

    #[tokio::test]
    async fn finish_round_twice_is_round_closed() {
        let h = Harness::new().await;
        let table_id = h.started_table().await;
        h.flow.start_round(table_id).await.unwrap();
        let round = h
            .repo
            .find_current_round_for_table(table_id)
            .await
            .unwrap()
            .unwrap();

        h.flow.finish_round(table_id, round.id).await.unwrap();
        let writes = h.repo.write_count();
        h.realtime.clear_deliveries();

        let err = h.flow.finish_round(table_id, round.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RoundClosed);
        assert_eq!(h.repo.write_count(), writes);
        assert!(h.realtime.events_for("remote-1").is_empty());
    }

    #[tokio::test]
    async fn finish_game_stamps_end_time_once() {
        let h = Harness::new().await;
        let table_id = h.started_table().await;

        h.flow.finish_game(table_id).await.unwrap();
        assert!(h.repo.table_status(table_id).await.unwrap().unwrap().is_closed());
        assert!(h
            .realtime
            .events_for("remote-1")
            .contains(&"GameFinished".to_string()));

        let player_id = h.player(1).await;
        assert!(!h.flow.pubsub().room(table_id).contains(player_id).await.unwrap());

        let err = h.flow.finish_game(table_id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TableClosed);
    }

    fn count(events: &[String], name: &str) -> usize {
        events.iter().filter(|e| e.as_str() == name).count()
    }

    /// One of the two results is `Ok`, the other fails with `code`.
    fn one_wins(a: &Result<(), AppError>, b: &Result<(), AppError>, code: ErrorCode) {
        let err = match (a, b) {
            (Ok(()), Err(err)) | (Err(err), Ok(())) => err,
            other => panic!("expected exactly one success, got {other:?}"),
        };
        assert_eq!(err.code(), code);
    }

    #[tokio::test]
    async fn overlapping_start_game_starts_once() {
        let h = Harness::interleaved().await;
        let table_id = h.ready_table().await;

        let (a, b) = tokio::join!(
            h.flow.start_game(table_id, ""),
            h.flow.start_game(table_id, "")
        );

        one_wins(&a, &b, ErrorCode::AlreadyStarted);
        assert_eq!(count(&h.realtime.events_for("remote-1"), "GameStarted"), 1);
        assert_eq!(h.drain_tasks().await, vec!["START_ROUND"]);
    }

    #[tokio::test]
    async fn overlapping_start_round_deals_once() {
        let h = Harness::interleaved().await;
        let table_id = h.started_table().await;
        h.realtime.clear_deliveries();

        let (a, b) = tokio::join!(h.flow.start_round(table_id), h.flow.start_round(table_id));

        one_wins(&a, &b, ErrorCode::RoundInProgress);
        let rounds = h.repo.rounds_for_table(table_id);
        assert_eq!(rounds.len(), 1);
        let status = h.repo.table_status(table_id).await.unwrap().unwrap();
        assert_eq!(status.signature, rounds[0].signature);
        for n in 1..=4 {
            let events = h.realtime.events_for(&format!("remote-{n}"));
            assert_eq!(count(&events, "RoundStarted"), 1);
        }
        assert_eq!(h.drain_tasks().await, vec!["START_DEAL"]);
    }

    #[tokio::test]
    async fn overlapping_finish_game_finishes_once() {
        let h = Harness::interleaved().await;
        let table_id = h.started_table().await;
        h.realtime.clear_deliveries();

        let (a, b) = tokio::join!(h.flow.finish_game(table_id), h.flow.finish_game(table_id));

        one_wins(&a, &b, ErrorCode::TableClosed);
        assert_eq!(count(&h.realtime.events_for("remote-2"), "GameFinished"), 1);
        let player_id = h.player(2).await;
        assert!(!h.flow.pubsub().room(table_id).contains(player_id).await.unwrap());
    }
}
