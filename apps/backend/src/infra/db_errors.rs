//! SeaORM -> DomainError translation.
//!
//! Partial unique indexes back the "one open row" guards of the lifecycle, so
//! a racing insert that slips past a guard re-read surfaces here as the same
//! conflict the guard would have raised.

use tracing::{error, warn};

use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind, NotFoundKind};
use crate::trace_ctx;

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

/// Map index and constraint names from the schema to domain conflicts.
fn map_constraint_to_conflict(error_msg: &str) -> Option<(ConflictKind, &'static str)> {
    if error_msg.contains("idx_rounds_open_per_table") {
        return Some((ConflictKind::RoundInProgress, "Table already has an open round"));
    }
    if error_msg.contains("idx_deals_open_per_round") {
        return Some((ConflictKind::DealInProgress, "Round already has an open deal"));
    }
    if error_msg.contains("idx_deal_orders_open_per_deal") {
        return Some((ConflictKind::MoveInProgress, "Deal already waits for a move"));
    }
    if error_msg.contains("idx_participants_table_player") {
        return Some((
            ConflictKind::AlreadyParticipant,
            "Player already sits at this table",
        ));
    }
    None
}

/// Translate a `DbErr` into a `DomainError` with a sanitized detail.
pub fn map_db_err(e: sea_orm::DbErr) -> DomainError {
    let error_msg = e.to_string();
    let trace_id = trace_ctx::trace_id();

    match &e {
        sea_orm::DbErr::RecordNotFound(_) => {
            return DomainError::not_found(
                NotFoundKind::Other("Record".into()),
                "Record not found",
            );
        }
        sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
            warn!(trace_id = %trace_id, raw_error = %error_msg, "Database unavailable");
            return DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
        }
        _ => {}
    }

    if mentions_sqlstate(&error_msg, "23505")
        || error_msg.contains("duplicate key value violates unique constraint")
    {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Unique constraint violation");
        if let Some((kind, detail)) = map_constraint_to_conflict(&error_msg) {
            return DomainError::conflict(kind, detail);
        }
        return DomainError::conflict(
            ConflictKind::Other("Unique".into()),
            "Unique constraint violation",
        );
    }

    if mentions_sqlstate(&error_msg, "23503") {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Foreign key constraint violation");
        return DomainError::not_found(
            NotFoundKind::Other("Reference".into()),
            "Referenced row does not exist",
        );
    }

    if error_msg.contains("timeout") || error_msg.contains("pool timed out") {
        warn!(trace_id = %trace_id, raw_error = %error_msg, "Database timeout");
        return DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    }

    error!(trace_id = %trace_id, raw_error = %error_msg, "Unhandled database error");
    DomainError::infra(
        InfraErrorKind::Other("DbErr".into()),
        "Database operation failed",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(msg: &str) -> sea_orm::DbErr {
        sea_orm::DbErr::Custom(msg.to_string())
    }

    #[test]
    fn open_round_race_is_round_in_progress() {
        let err = map_db_err(custom(
            "error returned from database: duplicate key value violates unique constraint \"idx_rounds_open_per_table\"",
        ));
        assert!(matches!(
            err,
            DomainError::Conflict(ConflictKind::RoundInProgress, _)
        ));
    }

    #[test]
    fn unknown_unique_violation_is_generic_conflict() {
        let err = map_db_err(custom("SQLSTATE(23505) on players_user_id_key"));
        assert!(matches!(err, DomainError::Conflict(ConflictKind::Other(_), _)));
    }

    #[test]
    fn connection_loss_is_unavailable() {
        let err = map_db_err(sea_orm::DbErr::Conn(sea_orm::RuntimeErr::Internal(
            "refused".into(),
        )));
        assert!(matches!(
            err,
            DomainError::Infra(InfraErrorKind::DbUnavailable, _)
        ));
    }

    #[test]
    fn anything_else_is_infra() {
        let err = map_db_err(custom("syntax error at or near"));
        assert!(matches!(err, DomainError::Infra(InfraErrorKind::Other(_), _)));
    }
}
