use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};

use crate::error::AppError;
use crate::errors::ErrorCode;

/// Table id from the `{table_id}` path segment. Existence is checked by the
/// service, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableId(pub i64);

fn parse(req: &HttpRequest) -> Result<TableId, AppError> {
    let raw = req.match_info().get("table_id").ok_or_else(|| {
        AppError::bad_request(ErrorCode::BadRequest, "Missing table_id parameter")
    })?;
    let id = raw.parse::<i64>().map_err(|_| {
        AppError::bad_request(ErrorCode::BadRequest, format!("Invalid table id: {raw}"))
    })?;
    if id <= 0 {
        return Err(AppError::bad_request(
            ErrorCode::BadRequest,
            format!("Table id must be positive, got: {id}"),
        ));
    }
    Ok(TableId(id))
}

impl FromRequest for TableId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(parse(req))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn rejects_non_positive_ids() {
        let req = TestRequest::default()
            .param("table_id", "0")
            .to_http_request();
        let err = TableId::extract(&req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);

        let req = TestRequest::default()
            .param("table_id", "12")
            .to_http_request();
        assert_eq!(TableId::extract(&req).await.unwrap(), TableId(12));
    }
}
