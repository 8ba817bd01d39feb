//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
};
use tower::ServiceExt;

use fx_server::http::HandlerChain;
use fx_server::{Server, ServerOption};

pub use fx_server::observability::testing::RecordingLogger;

/// A server on an ephemeral loopback address with a recording logger.
pub fn server(deadline: Duration) -> (Server, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    let server = Server::new([
        ServerOption::Address("127.0.0.1:0".into()),
        ServerOption::Logger(logger.clone()),
        ServerOption::RequestDeadline(deadline),
    ])
    .unwrap();
    (server, logger)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// `name=value` of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with("fx="))
            .map(str::to_string)
    }
}

pub async fn send(chain: &HandlerChain, request: Request<Body>) -> TestResponse {
    let response = chain.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

pub fn request(method: Method, uri: &str, cookie: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(body).unwrap()
}

pub async fn get(chain: &HandlerChain, uri: &str) -> TestResponse {
    send(chain, request(Method::GET, uri, None, Body::empty())).await
}
