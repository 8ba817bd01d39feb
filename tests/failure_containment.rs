#![allow(dependency_on_unit_never_type_fallback)]
//! Panic recovery and request deadline through the full handler chain.

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, Method, StatusCode},
    routing::get,
};
use futures_util::stream::{self, StreamExt};
use tower::ServiceExt;

use fx_server::http::middleware::TIMEOUT_MESSAGE;
use fx_server::module::{ApiModule, JsonApiModule};
use fx_server::{BoxError, Shutdown};

mod common;

fn panicking_module() -> JsonApiModule {
    ApiModule::new(|_, router| {
        router
            .route("/message", get(|| async { panic!("handler exploded") }))
            .route(
                "/formatted",
                get(|| async {
                    let shard = 7;
                    panic!("shard {shard} unavailable")
                }),
            )
            .route(
                "/error",
                get(|| async {
                    let error: BoxError = "disk on fire".into();
                    std::panic::panic_any(error)
                }),
            )
            .route("/value", get(|| async { std::panic::panic_any(42u32) }))
            .route("/fine", get(|| async { "still serving" }));
        Ok(())
    })
}

#[tokio::test]
async fn test_each_panic_yields_one_500_and_one_error_log() {
    let (mut server, logger) = common::server(Duration::from_secs(5));
    let mut module = panicking_module();
    server.register_module("/boom", &mut module).unwrap();
    let chain = server.handler_chain();

    let cases = [
        ("/boom/message", "handler exploded"),
        ("/boom/formatted", "shard 7 unavailable"),
        ("/boom/error", "disk on fire"),
        ("/boom/value", "unknown error"),
    ];

    for (i, (uri, description)) in cases.iter().enumerate() {
        let response = common::get(&chain, uri).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(
            response.headers[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.body, *description);
        assert_eq!(logger.count("error"), i + 1, "{uri}");
    }

    let errors = logger.messages("error");
    assert!(errors[2].contains("disk on fire"));

    let response = common::get(&chain, "/boom/fine").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(logger.count("error"), cases.len());
}

#[tokio::test]
async fn test_deadline_returns_503_and_abandons_handler() {
    let (mut server, logger) = common::server(Duration::from_millis(100));
    let finished = Arc::new(AtomicBool::new(false));

    let flag = finished.clone();
    let mut module: JsonApiModule = ApiModule::new(move |_, router| {
        let flag = flag.clone();
        router
            .route(
                "/slow",
                get(move || {
                    let flag = flag.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(400)).await;
                        flag.store(true, Ordering::SeqCst);
                        "too late"
                    }
                }),
            )
            .route("/quick", get(|| async { "in time" }));
        Ok(())
    });
    server.register_module("/", &mut module).unwrap();
    let chain = server.handler_chain();

    let response = common::get(&chain, "/slow").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body, TIMEOUT_MESSAGE);
    assert_eq!(response.body, "Service unavailable. Request timeout");
    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(logger.count("warn"), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!finished.load(Ordering::SeqCst));

    let response = common::get(&chain, "/quick").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "in time");
    assert_eq!(logger.count("warn"), 1);
}

#[tokio::test]
async fn test_panic_inside_deadline_is_still_recovered() {
    let (mut server, logger) = common::server(Duration::from_millis(200));
    let mut module: JsonApiModule = ApiModule::new(|_, router| {
        router.route(
            "/late-panic",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                panic!("gave up")
            }),
        );
        Ok(())
    });
    server.register_module("/x", &mut module).unwrap();
    let chain = server.handler_chain();

    let response = common::get(&chain, "/x/late-panic").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, "gave up");
    assert_eq!(logger.count("error"), 1);
    assert_eq!(logger.count("warn"), 0);
}

#[tokio::test]
async fn test_panic_while_streaming_body_is_logged_once() {
    let (mut server, logger) = common::server(Duration::from_secs(5));
    let mut module: JsonApiModule = ApiModule::new(|_, router| {
        router
            .route(
                "/stream",
                get(|| async {
                    let chunks = stream::iter(0..2).map(|i| {
                        if i == 1 {
                            panic!("stream broke mid-body");
                        }
                        Ok::<_, std::io::Error>(Bytes::from_static(b"partial output"))
                    });
                    Body::from_stream(chunks)
                }),
            )
            .route("/fine", get(|| async { "still serving" }));
        Ok(())
    });
    server.register_module("/dl", &mut module).unwrap();

    let chain = server.handler_chain();
    let request = common::request(Method::GET, "/dl/stream", None, Body::empty());
    let response = chain.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .is_err());
    assert_eq!(logger.count("error"), 1);
    assert!(logger.messages("error")[0].contains("stream broke mid-body"));

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let serving = tokio::spawn(server.serve(listener, shutdown.subscribe()));

    let outcome = match reqwest::get(format!("http://{addr}/dl/stream")).await {
        Ok(response) => response.bytes().await.map(|_| ()),
        Err(e) => Err(e),
    };
    assert!(outcome.is_err());
    assert_eq!(logger.count("error"), 2);

    let fine = reqwest::get(format!("http://{addr}/dl/fine")).await.unwrap();
    assert_eq!(fine.text().await.unwrap(), "still serving");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(15), serving)
        .await
        .expect("server drains")
        .unwrap()
        .unwrap();
}
