use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use tracing::debug;

use super::remote::RemoteAddr;
use crate::error::AppError;
use crate::services::RequestContext;
use crate::state::app_state::AppState;

/// Resolves the caller's remote to the player of its open session. A remote
/// without a session yields a context with no player; operations that need
/// one fail with `SESSION_NOT_FOUND`.
impl FromRequest for RequestContext {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let remote = RemoteAddr::from_request(req, payload);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let RemoteAddr(remote) = remote.await?;
            let state = state.ok_or_else(|| AppError::internal("AppState not available"))?;

            let ctx = RequestContext::new(remote);
            match state
                .flow
                .repo()
                .get_opened_session_for_remote(&ctx.remote)
                .await?
            {
                Some(session) => Ok(ctx.with_player(session.player_id)),
                None => {
                    debug!(remote = %ctx.remote, "No open session for remote");
                    Ok(ctx)
                }
            }
        })
    }
}
