//! Liveness probe: database reachability, applied schema version and the
//! backlog of the stage queue.

use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use migration::get_latest_migration_version;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::queue::{QueueKind, TaskStore};
use crate::state::app_state::AppState;

/// Backlog counts stop here; a larger number only tells "a lot".
const BACKLOG_SCAN_LIMIT: usize = 1_000;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app_version: &'static str,
    db: DbHealth,
    queues: BTreeMap<&'static str, usize>,
    time: String,
}

#[derive(Debug, Serialize)]
struct DbHealth {
    status: &'static str,
    migration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn probe_db(db: Option<&DatabaseConnection>) -> DbHealth {
    let Some(db) = db else {
        return DbHealth {
            status: "memory",
            migration: None,
            error: None,
        };
    };

    let ping = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());
    if let Err(e) = db.query_one(ping).await {
        return DbHealth {
            status: "error",
            migration: None,
            error: Some(e.to_string()),
        };
    }

    DbHealth {
        status: "ok",
        migration: get_latest_migration_version(db).await.ok().flatten(),
        error: None,
    }
}

async fn backlog(tasks: &dyn TaskStore) -> Result<BTreeMap<&'static str, usize>, AppError> {
    let mut out = BTreeMap::new();
    for kind in QueueKind::ALL {
        let ids = tasks
            .due(kind, i64::MIN, i64::MAX, BACKLOG_SCAN_LIMIT)
            .await?;
        out.insert(kind.as_str(), ids.len());
    }
    Ok(out)
}

async fn health(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let db = probe_db(state.db()).await;
    let queues = backlog(state.tasks.as_ref()).await?;

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: if db.status == "error" { "degraded" } else { "ok" },
        app_version: env!("CARGO_PKG_VERSION"),
        db,
        queues,
        time: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string()),
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(health));
}
