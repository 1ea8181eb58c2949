use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};

use crate::error::AppError;
use crate::errors::ErrorCode;

/// Header naming the client channel a request comes from.
pub const REMOTE_HEADER: &str = "x-remote";

/// Remote (client channel id) of the caller, from the `x-remote` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

impl FromRequest for RemoteAddr {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let remote = req
            .headers()
            .get(REMOTE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| RemoteAddr(v.to_string()))
            .ok_or_else(|| {
                AppError::bad_request(
                    ErrorCode::InvalidHeader,
                    format!("Missing or empty {REMOTE_HEADER} header"),
                )
            });
        ready(remote)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn reads_the_header() {
        let req = TestRequest::default()
            .insert_header((REMOTE_HEADER, " chan-1 "))
            .to_http_request();
        let remote = RemoteAddr::extract(&req).await.unwrap();
        assert_eq!(remote, RemoteAddr("chan-1".into()));
    }

    #[actix_web::test]
    async fn missing_header_is_bad_request() {
        let req = TestRequest::default().to_http_request();
        let err = RemoteAddr::extract(&req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidHeader);
        assert_eq!(err.status().as_u16(), 400);
    }
}
