//! Session lifecycle: binding a remote to a player and cleaning up seats when
//! the binding ends.

use serde::Serialize;
use tracing::{debug, info};

use super::tables::seat_changed;
use super::TableFlowService;
use crate::error::AppError;
use crate::pubsub::{EventEnvelope, TableView};
use crate::repos::{Participant, ParticipantState, ParticipantUpdate, Player, Session};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOpened {
    pub session_id: i64,
    pub player_id: i64,
    pub name: String,
    /// Tables the player was seated at when they dropped, redacted for them.
    pub tables: Vec<TableView>,
}

impl TableFlowService {
    /// Bind `remote` to the player behind `user_id`, closing whatever session
    /// that player or that remote had before.
    pub async fn open_session(
        &self,
        remote: &str,
        user_id: &str,
        name: &str,
    ) -> Result<SessionOpened, AppError> {
        let player = self.repo.select_or_insert_player(user_id, name).await?;

        for previous in self.repo.opened_sessions_for_player(player.id).await? {
            self.close_session_record(&previous).await?;
        }
        if let Some(previous) = self.repo.get_opened_session_for_remote(remote).await? {
            self.close_session_record(&previous).await?;
        }

        let session = self.repo.create_session(player.id, remote).await?;
        self.pubsub.bind(remote, player.id).await?;
        info!(session_id = session.id, player_id = player.id, remote, "Session opened");

        let tables = self.restore_seats(&player).await?;
        Ok(SessionOpened {
            session_id: session.id,
            player_id: player.id,
            name: player.name,
            tables,
        })
    }

    /// Close the session open on `remote`. A remote without one is a no-op.
    pub async fn close_session(&self, remote: &str) -> Result<(), AppError> {
        match self.repo.get_opened_session_for_remote(remote).await? {
            Some(session) => self.close_session_record(&session).await,
            None => {
                debug!(remote, "No open session to close");
                Ok(())
            }
        }
    }

    async fn close_session_record(&self, session: &Session) -> Result<(), AppError> {
        self.pubsub
            .publish(
                &session.remote,
                &EventEnvelope::CloseSession {
                    session_id: session.id,
                    player_id: session.player_id,
                },
            )
            .await;
        if !self.repo.close_session(session.id).await? {
            debug!(session_id = session.id, "Session already closed");
        }
        self.pubsub.unbind(session.player_id).await?;
        info!(session_id = session.id, player_id = session.player_id, "Session closed");

        for seat in self.repo.get_participants_for_player(session.player_id).await? {
            self.release_seat(&seat).await?;
        }
        Ok(())
    }

    /// Seat cleanup after a session ends: DISCONNECT at a running table,
    /// FREE at one that has not started. Finished tables are left alone.
    async fn release_seat(&self, seat: &Participant) -> Result<(), AppError> {
        let status = self.require_status(seat.table_id).await?;
        if status.is_closed() {
            return Ok(());
        }

        let (update, player_id, state) = if status.is_started() {
            (
                ParticipantUpdate::new(seat.id).with_state(ParticipantState::Disconnect),
                seat.player_id,
                ParticipantState::Disconnect,
            )
        } else {
            (ParticipantUpdate::free(seat.id), None, ParticipantState::Free)
        };
        self.repo.update_participant(update).await?;

        let room = self.pubsub.room(seat.table_id);
        room.publish(&seat_changed(seat, player_id, state)).await;
        if let Some(player_id) = seat.player_id {
            room.remove(player_id).await?;
        }
        debug!(
            table_id = seat.table_id,
            order = seat.order,
            state = state.as_str(),
            "Seat released"
        );
        Ok(())
    }

    /// Put DISCONNECT seats at running tables back to READY and collect the
    /// snapshots the player missed.
    async fn restore_seats(&self, player: &Player) -> Result<Vec<TableView>, AppError> {
        let mut tables = Vec::new();
        for seat in self.repo.get_participants_for_player(player.id).await? {
            if seat.state != ParticipantState::Disconnect {
                continue;
            }
            let status = self.require_status(seat.table_id).await?;
            if !status.is_open() {
                continue;
            }

            self.repo
                .update_participant(
                    ParticipantUpdate::new(seat.id).with_state(ParticipantState::Ready),
                )
                .await?;
            let room = self.pubsub.room(seat.table_id);
            room.add(player.id).await?;
            room.publish(&seat_changed(&seat, Some(player.id), ParticipantState::Ready))
                .await;
            info!(table_id = seat.table_id, player_id = player.id, "Seat restored");

            let view = self.table_view(seat.table_id, &status.signature).await?;
            tables.push(view.redacted_for(player.id));
        }
        Ok(tables)
    }
}
