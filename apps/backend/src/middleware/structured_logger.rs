//! One completion line per request: method, path, calling remote, status
//! and duration, tagged with the trace id.

use std::future::{ready, Ready};
use std::time::Instant;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::{Error as ActixError, HttpMessage};
use futures_util::future::LocalBoxFuture;
use tracing::{error, info, warn};

use super::request_trace::TraceId;
use crate::extractors::remote::REMOTE_HEADER;

pub struct StructuredLogger;

impl<S, B> Transform<S, ServiceRequest> for StructuredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = StructuredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StructuredLoggerMiddleware { service }))
    }
}

pub struct StructuredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for StructuredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let line = RequestLine {
            method: req.method().to_string(),
            path: req.path().to_string(),
            remote: req
                .headers()
                .get(REMOTE_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string(),
            trace_id: req
                .extensions()
                .get::<TraceId>()
                .map(|t| t.0.clone())
                .unwrap_or_else(|| "unknown".to_string()),
        };

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let status = match &result {
                Ok(res) => res.status(),
                Err(err) => err.as_response_error().status_code(),
            };
            line.emit(status, started.elapsed().as_micros() as u64);
            result
        })
    }
}

struct RequestLine {
    method: String,
    path: String,
    remote: String,
    trace_id: String,
}

impl RequestLine {
    fn emit(&self, status: StatusCode, duration_us: u64) {
        let code = status.as_u16();
        let RequestLine {
            method,
            path,
            remote,
            trace_id,
        } = self;
        if status.is_server_error() {
            error!(%method, %path, %remote, status = code, duration_us, %trace_id, "request_completed");
        } else if status.is_client_error() {
            warn!(%method, %path, %remote, status = code, duration_us, %trace_id, "request_completed");
        } else {
            info!(%method, %path, %remote, status = code, duration_us, %trace_id, "request_completed");
        }
    }
}
