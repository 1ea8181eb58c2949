//! Moves and readiness: the two player actions that advance the lifecycle.

use tracing::{debug, info};

use super::{ensure_open, parse_signature, TableFlowService};
use crate::dispatch::Stage;
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError, InvalidStateKind, NotFoundKind};
use crate::pubsub::{EventEnvelope, TableView};
use crate::repos::{ParticipantState, ParticipantUpdate, TableUpdate, SEAT_COUNT};
use crate::services::RequestContext;

impl TableFlowService {
    /// Play `card` on the caller's open turn.
    ///
    /// The engine runs before anything is written, so a rejected card leaves
    /// the signature and the open turn untouched. Returns the table as the
    /// caller now sees it.
    pub async fn make_move(
        &self,
        ctx: &RequestContext,
        table_id: i64,
        card: &str,
    ) -> Result<TableView, AppError> {
        let player_id = ctx.require_player()?;
        let status = self.require_status(table_id).await?;
        ensure_open(table_id, &status)?;

        let order = self
            .repo
            .find_current_deal_order_for_table(table_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(
                    NotFoundKind::DealOrder,
                    format!("Table {table_id} is not waiting for a move"),
                )
            })?;
        let participant = self
            .repo
            .find_participant(order.participant_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(
                    NotFoundKind::Participant,
                    format!("Participant {} not found", order.participant_id),
                )
            })?;
        if participant.player_id != Some(player_id) {
            return Err(not_your_turn(player_id, table_id));
        }

        let signature = self.engine.make_move(&status.signature, card).await?;

        if !self.repo.close_deal_order(order.id, card).await? {
            return Err(not_your_turn(player_id, table_id));
        }
        self.repo
            .update_table(TableUpdate::new(table_id).with_signature(signature.clone()))
            .await?;
        debug!(table_id, player_id, card, order = participant.order, "Card played");

        self.pubsub
            .room(table_id)
            .publish(&EventEnvelope::PlayerMoved {
                table_id,
                player_id,
                card: card.to_string(),
                order: participant.order,
            })
            .await;

        let sig = parse_signature(&signature)?;
        if sig.table_empty() {
            self.schedule(Stage::FinishDeal, table_id, order.deal_id.to_string())
                .await?;
        } else {
            self.schedule(Stage::NextMove, table_id, "").await?;
        }

        let view = self.table_view(table_id, &signature).await?;
        Ok(view.redacted_for(player_id))
    }

    /// Mark the caller's seat READY; the fourth READY seat schedules the game
    /// start.
    pub async fn ready(&self, ctx: &RequestContext, table_id: i64) -> Result<(), AppError> {
        let player_id = ctx.require_player()?;
        let status = self.require_status(table_id).await?;
        if status.is_closed() {
            return Err(DomainError::conflict(
                ConflictKind::TableClosed,
                format!("Table {table_id} is finished"),
            )
            .into());
        }
        if status.is_started() {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyStarted,
                format!("Table {table_id} already started"),
            )
            .into());
        }

        let seat = self
            .repo
            .participant_for_player(table_id, player_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(
                    NotFoundKind::Participant,
                    format!("Player {player_id} has no seat at table {table_id}"),
                )
            })?;
        if seat.state == ParticipantState::Ready {
            return Err(DomainError::conflict(
                ConflictKind::ParticipantReady,
                format!("Player {player_id} is already ready"),
            )
            .into());
        }

        self.repo
            .update_participant(ParticipantUpdate::new(seat.id).with_state(ParticipantState::Ready))
            .await?;
        self.pubsub
            .room(table_id)
            .publish(&EventEnvelope::ParticipantStateChanged {
                table_id,
                participant_id: seat.id,
                player_id: Some(player_id),
                order: seat.order,
                state: ParticipantState::Ready.as_str().to_string(),
            })
            .await;

        let ready = self.repo.table_ready_count(table_id).await?;
        if ready < SEAT_COUNT as usize {
            debug!(table_id, ready, "Waiting for more ready players");
            return Ok(());
        }

        let players = self
            .repo
            .participants_for_table(table_id)
            .await?
            .iter()
            .filter_map(|p| p.player_id)
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        info!(table_id, players = %players, "All seats ready");
        self.schedule(Stage::StartGame, table_id, players).await
    }
}

fn not_your_turn(player_id: i64, table_id: i64) -> AppError {
    DomainError::invalid_state(
        InvalidStateKind::OrderError,
        format!("It is not player {player_id}'s turn at table {table_id}"),
    )
    .into()
}
