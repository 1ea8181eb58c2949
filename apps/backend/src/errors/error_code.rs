//! Error codes for the table service API.
//!
//! Add new codes here; never pass ad-hoc strings as error codes. All codes
//! are SCREAMING_SNAKE_CASE and map 1:1 to the strings that appear in HTTP
//! responses and in dispatcher logs.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Request Validation
    /// Signature could not be parsed by the rules engine
    InvalidSignature,
    /// Card is not playable from the mover's hand
    InvalidMove,
    /// Card string is malformed
    InvalidCard,
    /// Seat number outside 1..=4
    InvalidSeat,
    /// Task payload could not be decoded
    InvalidPayload,
    /// Invalid or missing HTTP header
    InvalidHeader,
    ValidationError,
    BadRequest,

    // Resource Not Found
    TableNotFound,
    SessionNotFound,
    ParticipantNotFound,
    RoundNotFound,
    DealNotFound,
    DealOrderNotFound,
    PlayerNotFound,
    NotFound,

    // Conflicts
    AlreadyStarted,
    AlreadyJoined,
    AlreadyParticipant,
    RoundClosed,
    DealClosed,
    TableClosed,
    ParticipantReady,
    RoundInProgress,
    DealInProgress,
    MoveInProgress,
    Conflict,

    // Invalid State
    ParticipantNotFree,
    NoEmptyPlaces,
    /// Not the caller's turn
    OrderError,
    TableNotStarted,
    NotEnoughPlayers,
    InvalidState,

    // System Errors
    DbError,
    DbUnavailable,
    DbTimeout,
    QueueUnavailable,
    PubSubUnavailable,
    DataCorruption,
    ConfigError,
    Internal,
}

impl ErrorCode {
    /// Canonical SCREAMING_SNAKE_CASE string for this code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            // Request Validation
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidMove => "INVALID_MOVE",
            Self::InvalidCard => "INVALID_CARD",
            Self::InvalidSeat => "INVALID_SEAT",
            Self::InvalidPayload => "INVALID_PAYLOAD",
            Self::InvalidHeader => "INVALID_HEADER",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",

            // Resource Not Found
            Self::TableNotFound => "TABLE_NOT_FOUND",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::ParticipantNotFound => "PARTICIPANT_NOT_FOUND",
            Self::RoundNotFound => "ROUND_NOT_FOUND",
            Self::DealNotFound => "DEAL_NOT_FOUND",
            Self::DealOrderNotFound => "DEAL_ORDER_NOT_FOUND",
            Self::PlayerNotFound => "PLAYER_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            // Conflicts
            Self::AlreadyStarted => "ALREADY_STARTED",
            Self::AlreadyJoined => "ALREADY_JOINED",
            Self::AlreadyParticipant => "ALREADY_PARTICIPANT",
            Self::RoundClosed => "ROUND_CLOSED",
            Self::DealClosed => "DEAL_CLOSED",
            Self::TableClosed => "TABLE_CLOSED",
            Self::ParticipantReady => "PARTICIPANT_READY",
            Self::RoundInProgress => "ROUND_IN_PROGRESS",
            Self::DealInProgress => "DEAL_IN_PROGRESS",
            Self::MoveInProgress => "MOVE_IN_PROGRESS",
            Self::Conflict => "CONFLICT",

            // Invalid State
            Self::ParticipantNotFree => "PARTICIPANT_NOT_FREE",
            Self::NoEmptyPlaces => "NO_EMPTY_PLACES",
            Self::OrderError => "ORDER_ERROR",
            Self::TableNotStarted => "TABLE_NOT_STARTED",
            Self::NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            Self::InvalidState => "INVALID_STATE",

            // System Errors
            Self::DbError => "DB_ERROR",
            Self::DbUnavailable => "DB_UNAVAILABLE",
            Self::DbTimeout => "DB_TIMEOUT",
            Self::QueueUnavailable => "QUEUE_UNAVAILABLE",
            Self::PubSubUnavailable => "PUBSUB_UNAVAILABLE",
            Self::DataCorruption => "DATA_CORRUPTION",
            Self::ConfigError => "CONFIG_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
