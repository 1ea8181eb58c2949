//! Domain-level error type used across services, repositories and the
//! rules engine.
//!
//! This error type is HTTP- and DB-agnostic. Handlers return
//! `Result<T, crate::error::AppError>` and convert through the
//! `From<DomainError> for AppError` implementation.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Infra error kinds to distinguish operational failures
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InfraErrorKind {
    Timeout,
    DbUnavailable,
    QueueUnavailable,
    PubSubUnavailable,
    DataCorruption,
    Other(String),
}

/// Entities that a lookup can miss
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Table,
    Session,
    Participant,
    Round,
    Deal,
    DealOrder,
    Player,
    Other(String),
}

/// Duplicate or stale actions against state that already moved on
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
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
    Other(String),
}

/// Actions that are well-formed but not allowed in the current state
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidStateKind {
    ParticipantNotFree,
    NoEmptyPlaces,
    /// Not the caller's turn
    OrderError,
    TableNotStarted,
    NotEnoughPlayers,
    Other(String),
}

/// Rejected input, including rules-engine rejections
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationKind {
    InvalidSignature,
    InvalidMove,
    InvalidCard,
    InvalidSeat,
    InvalidPayload,
    Other(String),
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Input/user validation or rules violation
    Validation(ValidationKind, String),
    /// Semantic conflict with state that already changed
    Conflict(ConflictKind, String),
    /// Action not permitted in the current state
    InvalidState(InvalidStateKind, String),
    /// Missing resource in domain terms
    NotFound(NotFoundKind, String),
    /// Infrastructure/operational failures
    Infra(InfraErrorKind, String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Validation(kind, d) => write!(f, "validation {kind:?}: {d}"),
            DomainError::Conflict(kind, d) => write!(f, "conflict {kind:?}: {d}"),
            DomainError::InvalidState(kind, d) => write!(f, "invalid state {kind:?}: {d}"),
            DomainError::NotFound(kind, d) => write!(f, "not found {kind:?}: {d}"),
            DomainError::Infra(kind, d) => write!(f, "infra {kind:?}: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn validation(kind: ValidationKind, detail: impl Into<String>) -> Self {
        Self::Validation(kind, detail.into())
    }
    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict(kind, detail.into())
    }
    pub fn invalid_state(kind: InvalidStateKind, detail: impl Into<String>) -> Self {
        Self::InvalidState(kind, detail.into())
    }
    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }
    pub fn infra(kind: InfraErrorKind, detail: impl Into<String>) -> Self {
        Self::Infra(kind, detail.into())
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(err: sea_orm::DbErr) -> Self {
        crate::infra::db_errors::map_db_err(err)
    }
}
