//! Caller identity threaded through every table operation.

use crate::error::AppError;
use crate::errors::ErrorCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Client channel the caller is connected on.
    pub remote: String,
    /// Player bound to `remote` by an open session, if any.
    pub player_id: Option<i64>,
}

impl RequestContext {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            player_id: None,
        }
    }

    pub fn with_player(mut self, player_id: i64) -> Self {
        self.player_id = Some(player_id);
        self
    }

    pub fn require_player(&self) -> Result<i64, AppError> {
        self.player_id.ok_or_else(|| {
            AppError::not_found(
                ErrorCode::SessionNotFound,
                format!("No open session for remote {}", self.remote),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_player_is_session_not_found() {
        let err = RequestContext::new("r1").require_player().unwrap_err();
        assert_eq!(err.code(), ErrorCode::SessionNotFound);
        assert_eq!(RequestContext::new("r1").with_player(3).require_player().unwrap(), 3);
    }
}
