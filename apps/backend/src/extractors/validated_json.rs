use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::web::Bytes;
use actix_web::{FromRequest, HttpRequest};
use serde::de::DeserializeOwned;
use serde_json::Error as JsonError;
use tracing::debug;

use crate::error::AppError;
use crate::errors::ErrorCode;

/// JSON body whose parse failures render as `INVALID_PAYLOAD` problem details
/// instead of actix's plain-text 400.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> ValidatedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> FromRequest for ValidatedJson<T>
where
    T: DeserializeOwned + 'static,
{
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let body = Bytes::from_request(req, payload);

        Box::pin(async move {
            let body = body.await.map_err(|e| {
                debug!(error = %e, "Failed to read request body");
                AppError::bad_request(ErrorCode::BadRequest, "Failed to read request body")
            })?;

            serde_json::from_slice::<T>(&body)
                .map(ValidatedJson)
                .map_err(|e| {
                    debug!(error = %e, body_size = body.len(), "JSON parsing failed");
                    AppError::invalid(ErrorCode::InvalidPayload, classify_json_error(&e))
                })
        })
    }
}

/// Sanitized description of a body parse failure.
fn classify_json_error(error: &JsonError) -> String {
    match error.classify() {
        serde_json::error::Category::Syntax => {
            format!("Invalid JSON at line {}", error.line())
        }
        serde_json::error::Category::Eof => "Invalid JSON: unexpected end of input".to_string(),
        serde_json::error::Category::Data => {
            "Invalid JSON: wrong types for one or more fields".to_string()
        }
        serde_json::error::Category::Io => "Invalid JSON: I/O error while reading body".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct MoveBody {
        card: String,
    }

    #[actix_web::test]
    async fn parses_a_valid_body() {
        let (req, mut payload) = TestRequest::post()
            .set_payload(r#"{"card":"50"}"#)
            .to_http_parts();
        let body = ValidatedJson::<MoveBody>::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert_eq!(body.card, "50");
    }

    #[actix_web::test]
    async fn wrong_types_are_invalid_payload() {
        let (req, mut payload) = TestRequest::post()
            .set_payload(r#"{"card": 5}"#)
            .to_http_parts();
        let err = ValidatedJson::<MoveBody>::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPayload);
        assert_eq!(err.status().as_u16(), 422);
    }

    #[test]
    fn classifies_truncated_input() {
        let error = serde_json::from_str::<MoveBody>(r#"{"card": "5"#).unwrap_err();
        assert!(classify_json_error(&error).contains("unexpected end of input"));
    }
}
