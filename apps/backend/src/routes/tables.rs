//! Table routes: lobby operations, readiness and moves.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::{TableId, ValidatedJson};
use crate::repos::Currency;
use crate::services::RequestContext;
use crate::state::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTableRequest {
    pub bet: i64,
    pub currency: Currency,
}

#[derive(Debug, Default, Deserialize)]
pub struct BecomeParticipantRequest {
    /// 1-based seat; the first free seat when absent.
    #[serde(default)]
    pub order: Option<i16>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub card: String,
}

/// GET /api/tables
async fn list_tables(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let tables = app_state.flow.get_open_tables().await?;
    Ok(HttpResponse::Ok().json(tables))
}

/// POST /api/tables
async fn create_table(
    ctx: RequestContext,
    body: ValidatedJson<CreateTableRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let table = app_state
        .flow
        .create_table(&ctx, body.bet, body.currency)
        .await?;
    Ok(HttpResponse::Created().json(table))
}

/// POST /api/tables/{table_id}/join
async fn join_table(
    ctx: RequestContext,
    table_id: TableId,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let table = app_state.flow.join_table(&ctx, table_id.0).await?;
    Ok(HttpResponse::Ok().json(table))
}

/// POST /api/tables/{table_id}/leave
async fn leave_table(
    ctx: RequestContext,
    table_id: TableId,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    app_state.flow.leave_table(&ctx, table_id.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/tables/{table_id}/participants
async fn become_participant(
    ctx: RequestContext,
    table_id: TableId,
    body: Option<web::Json<BecomeParticipantRequest>>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let order = body.and_then(|b| b.into_inner().order);
    let table = app_state
        .flow
        .become_participant(&ctx, table_id.0, order)
        .await?;
    Ok(HttpResponse::Ok().json(table))
}

/// POST /api/tables/{table_id}/ready
async fn ready(
    ctx: RequestContext,
    table_id: TableId,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    app_state.flow.ready(&ctx, table_id.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/tables/{table_id}/moves
///
/// Returns the table as the mover now sees it: their own hand plus every
/// other seat's card count.
async fn make_move(
    ctx: RequestContext,
    table_id: TableId,
    body: ValidatedJson<MoveRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let view = app_state
        .flow
        .make_move(&ctx, table_id.0, &body.card)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list_tables))
            .route(web::post().to(create_table)),
    )
    .route("/{table_id}/join", web::post().to(join_table))
    .route("/{table_id}/leave", web::post().to(leave_table))
    .route("/{table_id}/participants", web::post().to(become_participant))
    .route("/{table_id}/ready", web::post().to(ready))
    .route("/{table_id}/moves", web::post().to(make_move));
}
