//! Server-wide request deadline.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::RequestIdExt;
use crate::observability::{metrics, SharedLogger};

/// Body of the response sent when a request runs past its deadline.
pub const TIMEOUT_MESSAGE: &str = "Service unavailable. Request timeout";

#[derive(Clone)]
pub struct Deadline {
    pub duration: Duration,
    pub logger: SharedLogger,
}

/// Race the rest of the chain against the deadline. When the deadline wins
/// the handler future is dropped and a fixed 503 is returned instead.
pub async fn enforce_deadline(
    State(deadline): State<Deadline>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request.request_id().to_string();

    match tokio::time::timeout(deadline.duration, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            deadline.logger.warn(&format_args!(
                "request {request_id} {method} {path} exceeded the {:?} deadline",
                deadline.duration
            ));
            metrics::record_timeout();
            timeout_response()
        }
    }
}

pub fn timeout_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        TIMEOUT_MESSAGE,
    )
        .into_response()
}
