//! Session routes: bind and release the caller's remote.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::{RemoteAddr, ValidatedJson};
use crate::state::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub user_id: String,
    pub name: String,
}

/// POST /api/sessions
async fn open_session(
    remote: RemoteAddr,
    body: ValidatedJson<OpenSessionRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let opened = app_state
        .flow
        .open_session(&remote.0, &body.user_id, &body.name)
        .await?;
    Ok(HttpResponse::Created().json(opened))
}

/// DELETE /api/sessions
async fn close_session(
    remote: RemoteAddr,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    app_state.flow.close_session(&remote.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::post().to(open_session))
            .route(web::delete().to(close_session)),
    );
}
