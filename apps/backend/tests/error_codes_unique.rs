use std::collections::HashSet;

use belka_backend::ErrorCode;

#[test]
fn error_codes_are_unique() {
    let all = [
        // Keep in sync with ErrorCode enum variants
        ErrorCode::InvalidSignature,
        ErrorCode::InvalidMove,
        ErrorCode::InvalidCard,
        ErrorCode::InvalidSeat,
        ErrorCode::InvalidPayload,
        ErrorCode::InvalidHeader,
        ErrorCode::ValidationError,
        ErrorCode::BadRequest,
        ErrorCode::TableNotFound,
        ErrorCode::SessionNotFound,
        ErrorCode::ParticipantNotFound,
        ErrorCode::RoundNotFound,
        ErrorCode::DealNotFound,
        ErrorCode::DealOrderNotFound,
        ErrorCode::PlayerNotFound,
        ErrorCode::NotFound,
        ErrorCode::AlreadyStarted,
        ErrorCode::AlreadyJoined,
        ErrorCode::AlreadyParticipant,
        ErrorCode::RoundClosed,
        ErrorCode::DealClosed,
        ErrorCode::TableClosed,
        ErrorCode::ParticipantReady,
        ErrorCode::RoundInProgress,
        ErrorCode::DealInProgress,
        ErrorCode::MoveInProgress,
        ErrorCode::Conflict,
        ErrorCode::ParticipantNotFree,
        ErrorCode::NoEmptyPlaces,
        ErrorCode::OrderError,
        ErrorCode::TableNotStarted,
        ErrorCode::NotEnoughPlayers,
        ErrorCode::InvalidState,
        ErrorCode::DbError,
        ErrorCode::DbUnavailable,
        ErrorCode::DbTimeout,
        ErrorCode::QueueUnavailable,
        ErrorCode::PubSubUnavailable,
        ErrorCode::DataCorruption,
        ErrorCode::ConfigError,
        ErrorCode::Internal,
    ];

    let mut seen = HashSet::new();
    for code in all {
        let s = code.as_str();
        assert!(seen.insert(s), "Duplicate error code string: {s}");
        assert!(
            s.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
            "{s} is not SCREAMING_SNAKE_CASE"
        );
    }
}
