//! Table orchestration: the stage handlers of the game lifecycle and the
//! synchronous table operations that feed them.
//!
//! Every stage re-reads persisted state and checks its guard before writing,
//! then schedules exactly one follow-up stage. A duplicate delivery fails its
//! guard and does nothing.

mod lifecycle;
mod player_actions;
mod sessions;
mod tables;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use crate::dispatch::{DispatchError, Dispatcher, Stage, StageHandler};
use crate::engine::cards::format_cards;
use crate::engine::{RulesEngine, Signature};
use crate::error::AppError;
use crate::errors::domain::{
    ConflictKind, DomainError, InvalidStateKind, NotFoundKind, ValidationKind,
};
use crate::pubsub::{PubSub, SeatView, TableView};
use crate::queue::{Task, TaskQueue};
use crate::repos::{Currency, GameRepository, Participant, ParticipantState, Table, TableStatus};

pub use sessions::SessionOpened;

/// Seat as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatSummary {
    pub participant_id: i64,
    pub order: i16,
    pub player_id: Option<i64>,
    pub state: ParticipantState,
}

impl From<&Participant> for SeatSummary {
    fn from(p: &Participant) -> Self {
        Self {
            participant_id: p.id,
            order: p.order,
            player_id: p.player_id,
            state: p.state,
        }
    }
}

/// Table with its seats, as returned by the lobby operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDetails {
    pub id: i64,
    pub creator_id: Option<i64>,
    pub bet: i64,
    pub currency: Currency,
    pub started: bool,
    pub finished: bool,
    pub seats: Vec<SeatSummary>,
}

impl TableDetails {
    fn new(table: &Table, seats: &[Participant]) -> Self {
        Self {
            id: table.id,
            creator_id: table.creator_id,
            bet: table.bet,
            currency: table.currency,
            started: table.start_time.is_some(),
            finished: table.end_time.is_some(),
            seats: seats.iter().map(SeatSummary::from).collect(),
        }
    }
}

pub struct TableFlowService {
    repo: Arc<dyn GameRepository>,
    engine: Arc<dyn RulesEngine>,
    pubsub: PubSub,
    queue: TaskQueue,
    stage_delay: Duration,
}

impl TableFlowService {
    pub fn new(
        repo: Arc<dyn GameRepository>,
        engine: Arc<dyn RulesEngine>,
        pubsub: PubSub,
        queue: TaskQueue,
    ) -> Self {
        Self {
            repo,
            engine,
            pubsub,
            queue,
            stage_delay: Duration::from_secs(1),
        }
    }

    /// Delay between a stage finishing and the next one becoming due.
    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.stage_delay = delay;
        self
    }

    pub fn repo(&self) -> &Arc<dyn GameRepository> {
        &self.repo
    }

    pub fn pubsub(&self) -> &PubSub {
        &self.pubsub
    }

    /// Route every stage to this service.
    pub fn register_stages(
        self: &Arc<Self>,
        dispatcher: &mut Dispatcher,
    ) -> Result<(), DispatchError> {
        for stage in Stage::ALL {
            dispatcher.register(
                stage,
                Arc::new(StageRoute {
                    flow: Arc::clone(self),
                    stage,
                }),
            )?;
        }
        Ok(())
    }

    async fn schedule(
        &self,
        stage: Stage,
        table_id: i64,
        payload: impl Into<String>,
    ) -> Result<(), AppError> {
        let task = Task::new(stage.as_str(), table_id.to_string())
            .with_delay(self.stage_delay)
            .with_payload(payload);
        debug!(table_id, stage = stage.as_str(), task_id = %task.id, "Scheduling stage");
        self.queue.add_task(task).await
    }

    async fn require_status(&self, table_id: i64) -> Result<TableStatus, AppError> {
        self.repo
            .table_status(table_id)
            .await?
            .ok_or_else(|| table_not_found(table_id))
    }

    async fn require_table(&self, table_id: i64) -> Result<Table, AppError> {
        self.repo
            .find_table(table_id)
            .await?
            .ok_or_else(|| table_not_found(table_id))
    }

    /// Full snapshot of a table; callers redact it per recipient.
    async fn table_view(&self, table_id: i64, signature: &str) -> Result<TableView, AppError> {
        let sig = parse_signature(signature)?;
        let seats = self.repo.participants_for_table(table_id).await?;

        let mut players = Vec::with_capacity(seats.len());
        for seat in &seats {
            let name = match seat.player_id {
                Some(player_id) => self.repo.find_player(player_id).await?.map(|p| p.name),
                None => None,
            };
            let hand = &sig.hands[seat.seat() as usize];
            players.push(SeatView {
                participant_id: seat.id,
                player_id: seat.player_id,
                name,
                order: seat.order,
                state: seat.state.as_str().to_string(),
                cards: format_cards(hand),
                cards_count: hand.len(),
            });
        }

        Ok(TableView {
            id: table_id,
            trump: sig.trump.index(),
            turn: sig.turn,
            table_cards: format_cards(&sig.table),
            club_player: sig.club_player,
            dealer: sig.dealer,
            team_1_score: sig.round_scores[0],
            team_2_score: sig.round_scores[1],
            team_1_total: sig.totals[0],
            team_2_total: sig.totals[1],
            players,
        })
    }
}

/// Adapter registered with the dispatcher for one stage.
struct StageRoute {
    flow: Arc<TableFlowService>,
    stage: Stage,
}

#[async_trait]
impl StageHandler for StageRoute {
    async fn handle(&self, task: Task) -> Result<(), AppError> {
        let table_id = parse_id(&task.topic, "table id")?;
        match self.stage {
            Stage::StartGame => self.flow.start_game(table_id, &task.payload).await,
            Stage::StartRound => self.flow.start_round(table_id).await,
            Stage::StartDeal => self.flow.start_deal(table_id).await,
            Stage::NextMove => self.flow.next_move(table_id).await,
            Stage::FinishDeal => {
                let deal_id = parse_id(&task.payload, "deal id")?;
                self.flow.finish_deal(table_id, deal_id).await
            }
            Stage::FinishRound => {
                let round_id = parse_id(&task.payload, "round id")?;
                self.flow.finish_round(table_id, round_id).await
            }
            Stage::FinishGame => self.flow.finish_game(table_id).await,
        }
    }
}

fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    raw.parse::<i64>().map_err(|_| {
        DomainError::validation(
            ValidationKind::InvalidPayload,
            format!("Task {what} is not an id: {raw:?}"),
        )
        .into()
    })
}

fn table_not_found(table_id: i64) -> AppError {
    DomainError::not_found(NotFoundKind::Table, format!("Table {table_id} not found")).into()
}

/// Started and not finished, or the matching domain error.
fn ensure_open(table_id: i64, status: &TableStatus) -> Result<(), AppError> {
    if !status.is_started() {
        return Err(DomainError::invalid_state(
            InvalidStateKind::TableNotStarted,
            format!("Table {table_id} has not started"),
        )
        .into());
    }
    if status.is_closed() {
        return Err(DomainError::conflict(
            ConflictKind::TableClosed,
            format!("Table {table_id} is finished"),
        )
        .into());
    }
    Ok(())
}

/// A table that never dealt has an empty signature.
fn parse_signature(raw: &str) -> Result<Signature, AppError> {
    if raw.is_empty() {
        return Ok(Signature::initial());
    }
    Ok(raw.parse::<Signature>()?)
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_must_be_numeric() {
        assert_eq!(parse_id("42", "table id").unwrap(), 42);
        let err = parse_id("x", "deal id").unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::InvalidPayload);
    }

    #[test]
    fn open_guard_distinguishes_not_started_and_finished() {
        let now = OffsetDateTime::now_utc();
        let mut status = TableStatus {
            start_time: None,
            end_time: None,
            signature: String::new(),
        };
        let err = ensure_open(1, &status).unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::TableNotStarted);

        status.start_time = Some(now);
        assert!(ensure_open(1, &status).is_ok());

        status.end_time = Some(now);
        let err = ensure_open(1, &status).unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::TableClosed);
    }
}
