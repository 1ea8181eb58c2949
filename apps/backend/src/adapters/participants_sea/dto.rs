//! DTOs for participants_sea adapter.

use crate::entities::participants::ParticipantState;

/// Partial update of a seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantUpdate {
    pub id: i64,
    pub state: Option<ParticipantState>,
    /// Three-state: None = no change, Some(Some(id)) = set, Some(None) = clear.
    pub player_id: Option<Option<i64>>,
}

impl ParticipantUpdate {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            state: None,
            player_id: None,
        }
    }

    pub fn with_state(mut self, state: ParticipantState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_player(mut self, player_id: i64) -> Self {
        self.player_id = Some(Some(player_id));
        self
    }

    pub fn clear_player(mut self) -> Self {
        self.player_id = Some(None);
        self
    }

    /// Seat back to FREE with no player.
    pub fn free(id: i64) -> Self {
        Self::new(id)
            .with_state(ParticipantState::Free)
            .clear_player()
    }
}
