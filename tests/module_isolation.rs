//! Module registration and prefix isolation through the full handler chain.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

use fx_server::http::HandlerChain;
use fx_server::observability::testing::RecordingLogger;
use fx_server::module::{ApiModule, Codec, Json, JsonApiModule, Module, Xml};
use fx_server::{ConfigurationError, ServerError};

mod common;

fn counting_module(hits: Arc<AtomicUsize>) -> JsonApiModule {
    ApiModule::new(move |_, router| {
        let hits = hits.clone();
        router.route(
            "/hit",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "hit"
                }
            }),
        );
        Ok(())
    })
}

#[tokio::test]
async fn test_disjoint_prefixes_never_cross() {
    let (mut server, _) = common::server(Duration::from_secs(5));
    let a_hits = Arc::new(AtomicUsize::new(0));
    let b_hits = Arc::new(AtomicUsize::new(0));

    let mut a = counting_module(a_hits.clone());
    let mut b = counting_module(b_hits.clone());
    server.register_module("/a", &mut a).unwrap();
    server.register_module("/ab", &mut b).unwrap();
    let chain = server.handler_chain();

    for _ in 0..3 {
        assert_eq!(common::get(&chain, "/a/hit").await.status, StatusCode::OK);
    }
    assert_eq!(a_hits.load(Ordering::SeqCst), 3);
    assert_eq!(b_hits.load(Ordering::SeqCst), 0);

    assert_eq!(common::get(&chain, "/ab/hit").await.status, StatusCode::OK);
    assert_eq!(b_hits.load(Ordering::SeqCst), 1);
    assert_eq!(a_hits.load(Ordering::SeqCst), 3);

    assert_eq!(common::get(&chain, "/hit").await.status, StatusCode::NOT_FOUND);
    assert_eq!(common::get(&chain, "/c/hit").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_root_module_cannot_reach_into_other_prefixes() {
    let (mut server, _) = common::server(Duration::from_secs(5));
    let api_hits = Arc::new(AtomicUsize::new(0));
    let mut api = counting_module(api_hits.clone());
    server.register_module("/api", &mut api).unwrap();

    let mut root: JsonApiModule = ApiModule::new(|_, router| {
        router
            .route("/api/admin", get(|| async { "root answered" }))
            .route("/api/hit", get(|| async { "root answered" }))
            .route("/home", get(|| async { "home" }));
        Ok(())
    });
    server.register_module("/", &mut root).unwrap();
    let chain = server.handler_chain();

    let admin = common::get(&chain, "/api/admin").await;
    assert_eq!(admin.status, StatusCode::NOT_FOUND);
    assert_ne!(admin.body, "root answered");

    let hit = common::get(&chain, "/api/hit").await;
    assert_eq!(hit.body, "hit");
    assert_eq!(api_hits.load(Ordering::SeqCst), 1);

    assert_eq!(common::get(&chain, "/home").await.body, "home");
}

#[tokio::test]
async fn test_conflicting_routes_are_a_registration_error() {
    let (mut server, _) = common::server(Duration::from_secs(5));
    let mut module: JsonApiModule = ApiModule::new(|_, router| {
        router
            .route("/orders", get(|| async { "first" }))
            .route("/orders", get(|| async { "second" }));
        Ok(())
    });

    let err = server.register_module("/shop", &mut module).unwrap_err();
    assert!(matches!(err, ServerError::ModuleInitialization { ref prefix, .. } if prefix == "/shop"));
    assert_eq!(module.context_path(), "");
    assert!(server.mounted_prefixes().is_empty());

    let chain = server.handler_chain();
    assert_eq!(
        common::get(&chain, "/shop/orders").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_failed_initialize_is_reported_and_unmounted() {
    let (mut server, _) = common::server(Duration::from_secs(5));
    let mut broken: JsonApiModule = ApiModule::new(|_, router| {
        router.route("/never", get(|| async { "mounted anyway" }));
        Err("schema migration failed".into())
    });

    let err = server.register_module("/broken", &mut broken).unwrap_err();
    assert!(matches!(err, ServerError::ModuleInitialization { ref prefix, .. } if prefix == "/broken"));
    assert!(err.to_string().contains("schema migration failed"));

    let chain = server.handler_chain();
    assert_eq!(
        common::get(&chain, "/broken/never").await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_prefix_reuse_is_rejected() {
    let (mut server, _) = common::server(Duration::from_secs(5));
    let mut first = counting_module(Arc::default());
    let mut second = counting_module(Arc::default());

    server.register_module("/api", &mut first).unwrap();
    let err = server.register_module("api/", &mut second).unwrap_err();
    assert!(matches!(
        err,
        ServerError::Configuration(ConfigurationError::DuplicatePrefix(_))
    ));
}

#[tokio::test]
async fn test_module_sees_context_path_and_logger() {
    let (mut server, logger) = common::server(Duration::from_secs(5));
    let mut module: JsonApiModule = ApiModule::new(|module, router| {
        let module = module.clone();
        router.route(
            "/whereami",
            get(move || {
                let module = module.clone();
                async move {
                    if let Some(logger) = module.base().logger() {
                        logger.info(&"whereami called");
                    }
                    module.base().context_path().to_string()
                }
            }),
        );
        Ok(())
    });

    server.register_module("/v1/", &mut module).unwrap();
    assert_eq!(module.context_path(), "/v1");

    let chain = server.handler_chain();
    let response = common::get(&chain, "/v1/whereami").await;
    assert_eq!(response.body, "/v1");
    assert_eq!(logger.messages("info"), vec!["whereami called".to_string()]);
}

#[tokio::test]
async fn test_trailing_slash_and_standard_headers() {
    let (mut server, _) = common::server(Duration::from_secs(5));
    let mut module = counting_module(Arc::default());
    server.register_module("/svc", &mut module).unwrap();
    let chain = server.handler_chain();

    let response = common::get(&chain, "/svc/hit/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert!(response.headers.contains_key("x-request-id"));

    let missing = common::get(&chain, "/nowhere").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert!(missing.headers.contains_key("x-request-id"));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    item: String,
    quantity: u32,
}

fn echo_module<C: Codec>() -> ApiModule<C> {
    ApiModule::new(|module, router| {
        let module = module.clone();
        router.route(
            "/orders",
            post(move |body: Bytes| {
                let module = module.clone();
                async move {
                    match module.decode_request::<Order>(&body) {
                        Ok(order) => module.respond(StatusCode::CREATED, &order),
                        Err(e) => e.into_response(),
                    }
                }
            }),
        );
        Ok(())
    })
}

async fn post_order(chain: &HandlerChain, uri: &str, body: String) -> Response {
    let request = common::request(Method::POST, uri, None, Body::from(body));
    chain.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_json_and_xml_modules_round_trip() {
    let (mut server, _) = common::server(Duration::from_secs(5));
    let mut json = echo_module::<Json>();
    let mut xml = echo_module::<Xml>();
    server.register_module("/json", &mut json).unwrap();
    server.register_module("/xml", &mut xml).unwrap();
    let chain = server.handler_chain();

    let order = Order {
        item: "kibble".into(),
        quantity: 4,
    };

    let response = post_order(&chain, "/json/orders", serde_json::to_string(&order).unwrap()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json; charset=utf-8"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(json.decode_request::<Order>(&body).unwrap(), order);

    let xml_body = "<Order><item>kibble</item><quantity>4</quantity></Order>".to_string();
    let response = post_order(&chain, "/xml/orders", xml_body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(xml.decode_request::<Order>(&body).unwrap(), order);

    let response = post_order(&chain, "/json/orders", "{\"item\":".into()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let logger = Arc::new(RecordingLogger::default());
    let mut server = fx_server::Server::new([
        fx_server::ServerOption::Logger(logger),
        fx_server::ServerOption::MaxBodySize(16),
    ])
    .unwrap();
    let mut module = echo_module::<Json>();
    server.register_module("/json", &mut module).unwrap();
    let chain = server.handler_chain();

    let big = serde_json::to_string(&Order {
        item: "x".repeat(64),
        quantity: 1,
    })
    .unwrap();
    let response = post_order(&chain, "/json/orders", big).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_state_handlers_work_under_prefix() {
    #[derive(Clone)]
    struct Greeting(&'static str);

    async fn greet(State(greeting): State<Greeting>) -> &'static str {
        greeting.0
    }

    let (mut server, _) = common::server(Duration::from_secs(5));
    let mut module: JsonApiModule = ApiModule::new(|_, router| {
        router.route("/", get(greet).with_state(Greeting("hello")));
        Ok(())
    });
    server.register_module("/greet", &mut module).unwrap();
    let chain = server.handler_chain();

    assert_eq!(common::get(&chain, "/greet").await.body, "hello");
    assert_eq!(common::get(&chain, "/greet/").await.body, "hello");
}
