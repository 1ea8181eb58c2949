// Unit tests for error mapping - pure domain logic without HTTP or storage
use crate::errors::domain::{
    ConflictKind, DomainError, InfraErrorKind, InvalidStateKind, NotFoundKind, ValidationKind,
};
use crate::{AppError, ErrorCode};

#[test]
fn maps_rules_rejections_to_422() {
    let de = DomainError::validation(ValidationKind::InvalidMove, "card not in hand");
    let app: AppError = de.into();
    assert_eq!(app.code(), ErrorCode::InvalidMove);
    assert_eq!(app.status().as_u16(), 422);

    let de = DomainError::validation(ValidationKind::InvalidSignature, "13 fields");
    let app: AppError = de.into();
    assert_eq!(app.code().as_str(), "INVALID_SIGNATURE");
}

#[test]
fn maps_conflicts() {
    let closed = DomainError::conflict(ConflictKind::RoundClosed, "round 7 closed");
    let app: AppError = closed.into();
    assert_eq!(app.code().as_str(), "ROUND_CLOSED");
    assert_eq!(app.status().as_u16(), 409);

    let other = DomainError::conflict(ConflictKind::Other("x".into()), "generic");
    let app: AppError = other.into();
    assert_eq!(app.code().as_str(), "CONFLICT");
}

#[test]
fn maps_invalid_state_to_409_with_own_code() {
    let de = DomainError::invalid_state(InvalidStateKind::OrderError, "not your turn");
    let app: AppError = de.into();
    assert_eq!(app.code(), ErrorCode::OrderError);
    assert_eq!(app.status().as_u16(), 409);
    assert!(!app.is_transient());
}

#[test]
fn maps_not_found() {
    let nf = DomainError::not_found(NotFoundKind::Session, "no session for remote");
    let app: AppError = nf.into();
    assert_eq!(app.code().as_str(), "SESSION_NOT_FOUND");
    assert_eq!(app.status().as_u16(), 404);
}

#[test]
fn maps_infra_to_retryable_errors() {
    let t = DomainError::infra(InfraErrorKind::Timeout, "timeout");
    let app: AppError = t.into();
    assert_eq!(app.code().as_str(), "DB_TIMEOUT");
    assert_eq!(app.status().as_u16(), 504);
    assert!(app.is_transient());

    let down = DomainError::infra(InfraErrorKind::PubSubUnavailable, "down");
    let app: AppError = down.into();
    assert_eq!(app.code().as_str(), "PUBSUB_UNAVAILABLE");
    assert_eq!(app.status().as_u16(), 503);
    assert!(app.is_transient());

    let corrupt = DomainError::infra(InfraErrorKind::DataCorruption, "bad row");
    let app: AppError = corrupt.into();
    assert_eq!(app.code(), ErrorCode::DataCorruption);
    assert_eq!(app.status().as_u16(), 500);
    assert!(!app.is_transient());
}

#[test]
fn humanizes_codes_for_titles() {
    assert_eq!(AppError::humanize_code("ROUND_CLOSED"), "Round Closed");
    assert_eq!(AppError::humanize_code("ORDER_ERROR"), "Order Error");
}
