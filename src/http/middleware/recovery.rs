//! Panic recovery.
//!
//! Wraps routing and handlers in `tower_http::catch_panic`. The payload is
//! classified, logged once through the server logger, and answered with a
//! plain-text 500 carrying its description.
//!
//! A panic raised after the response head is out, while the body streams,
//! cannot become a 500. `GuardedBody` logs it the same way and ends the
//! stream with an error so the connection is aborted.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderValue, Response, StatusCode},
    middleware::Next,
};
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use crate::error::BoxError;
use crate::observability::{metrics, SharedLogger};

/// What a recovered panic carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanicPayload {
    /// `panic!("...")` with a string message.
    Message(String),
    /// An error value passed to `std::panic::panic_any`.
    Error(String),
    /// Anything else.
    Unknown,
}

impl PanicPayload {
    pub fn classify(payload: &(dyn Any + Send)) -> Self {
        if let Some(message) = payload.downcast_ref::<&'static str>() {
            PanicPayload::Message((*message).to_string())
        } else if let Some(message) = payload.downcast_ref::<String>() {
            PanicPayload::Message(message.clone())
        } else if let Some(error) = payload.downcast_ref::<BoxError>() {
            PanicPayload::Error(error.to_string())
        } else if let Some(error) = payload.downcast_ref::<Box<dyn std::error::Error + Send>>() {
            PanicPayload::Error(error.to_string())
        } else if let Some(error) = payload.downcast_ref::<std::io::Error>() {
            PanicPayload::Error(error.to_string())
        } else {
            PanicPayload::Unknown
        }
    }

    pub fn description(&self) -> &str {
        match self {
            PanicPayload::Message(text) | PanicPayload::Error(text) => text,
            PanicPayload::Unknown => "unknown error",
        }
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanicPayload::Message(text) => write!(f, "recovered from panic: {text}"),
            PanicPayload::Error(text) => write!(f, "recovered from panic with error: {text}"),
            PanicPayload::Unknown => f.write_str("recovered from panic: unknown error"),
        }
    }
}

impl std::error::Error for PanicPayload {}

/// Builds the 500 response for a caught panic.
#[derive(Clone)]
pub struct PanicResponder {
    logger: SharedLogger,
}

impl PanicResponder {
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger }
    }
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        let payload = PanicPayload::classify(err.as_ref());
        self.logger.error(&payload);
        metrics::record_recovered_panic();

        let mut response = Response::new(Body::from(payload.description().to_string()));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        response
    }
}

pub fn recovery_layer(logger: SharedLogger) -> CatchPanicLayer<PanicResponder> {
    CatchPanicLayer::custom(PanicResponder::new(logger))
}

/// Response body that contains panics raised while it is polled.
pub struct GuardedBody {
    inner: Option<Body>,
    logger: SharedLogger,
}

impl GuardedBody {
    pub fn new(inner: Body, logger: SharedLogger) -> Self {
        Self {
            inner: Some(inner),
            logger,
        }
    }
}

impl HttpBody for GuardedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
        let this = &mut *self;
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match panic::catch_unwind(AssertUnwindSafe(|| Pin::new(inner).poll_frame(cx))) {
            Ok(poll) => poll.map_err(Into::into),
            Err(err) => {
                // The inner body is unusable after unwinding.
                this.inner = None;
                let payload = PanicPayload::classify(err.as_ref());
                this.logger.error(&payload);
                metrics::record_recovered_panic();
                Poll::Ready(Some(Err(Box::new(payload) as BoxError)))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.as_ref().map_or(true, |body| body.is_end_stream())
    }

    fn size_hint(&self) -> SizeHint {
        self.inner
            .as_ref()
            .map_or_else(|| SizeHint::with_exact(0), |body| body.size_hint())
    }
}

/// Middleware wrapping every response body in a `GuardedBody`.
pub async fn guard_response_body(
    State(logger): State<SharedLogger>,
    request: Request,
    next: Next,
) -> Response<Body> {
    next.run(request)
        .await
        .map(|body| Body::new(GuardedBody::new(body, logger)))
}
