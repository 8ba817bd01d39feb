//! HTTP server setup and module hosting.
//!
//! # Responsibilities
//! - Validate construction options (address, logger, timeouts)
//! - Mount modules under isolated path prefixes
//! - Wrap the mounted routes in recovery, deadline, and request-id layers
//! - Bind, serve (optionally over TLS), and drain on shutdown

use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    Router,
};
use axum_server::Handle;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto::Builder as HttpBuilder;
use tokio::sync::broadcast;
use tower::{make::Shared, util::BoxCloneSyncService, Layer, ServiceBuilder, ServiceExt};
use tower_http::{
    limit::RequestBodyLimitLayer,
    normalize_path::NormalizePathLayer,
    set_header::SetResponseHeaderLayer,
    timeout::{RequestBodyTimeoutLayer, ResponseBodyTimeoutLayer},
    trace::TraceLayer,
};

use crate::config::{ServerConfig, TlsConfig};
use crate::error::{BoxError, ConfigurationError, ServerError};
use crate::http::middleware::{
    enforce_deadline, guard_response_body, recovery_layer, Deadline, PanicPayload,
};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::{signals::shutdown_signal, Shutdown};
use crate::module::{router::normalize_prefix, Module, ModuleRouter};
use crate::net::{parse_bind_address, tls::load_tls_config};
use crate::observability::{metrics::track_requests, SharedLogger};

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8888";
pub const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// How long in-flight requests may run once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// The complete request pipeline: middleware plus every mounted module.
pub type HandlerChain = BoxCloneSyncService<Request, Response, Infallible>;

/// A single construction setting. Later options of the same kind win.
#[derive(Clone)]
pub enum ServerOption {
    /// Listen address, `host:port` or `:port`.
    Address(String),
    /// Mandatory logger shared with every module.
    Logger(SharedLogger),
    /// Ceiling on reading a request body. Zero disables it.
    ReadTimeout(Duration),
    /// Ceiling on streaming a response body. Zero disables it.
    WriteTimeout(Duration),
    /// How long a keep-alive connection may wait for its next request.
    /// Zero disables it.
    IdleTimeout(Duration),
    /// Per-request deadline enforced by the deadline middleware.
    RequestDeadline(Duration),
    Tls(TlsConfig),
    MaxBodySize(usize),
}

impl ServerOption {
    /// Options derived from a configuration file. The logger is never part of
    /// configuration and must be added by the caller.
    pub fn from_config(config: &ServerConfig) -> Vec<ServerOption> {
        let timeouts = &config.timeouts;
        let mut options = vec![
            ServerOption::Address(config.listener.bind_address.clone()),
            ServerOption::ReadTimeout(Duration::from_secs(timeouts.read_secs)),
            ServerOption::WriteTimeout(Duration::from_secs(timeouts.write_secs)),
            ServerOption::IdleTimeout(Duration::from_secs(timeouts.idle_secs)),
            ServerOption::RequestDeadline(Duration::from_secs(timeouts.request_secs)),
            ServerOption::MaxBodySize(config.limits.max_body_size),
        ];
        if let Some(tls) = &config.listener.tls {
            options.push(ServerOption::Tls(tls.clone()));
        }
        options
    }
}

impl std::fmt::Debug for ServerOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerOption::Address(address) => f.debug_tuple("Address").field(address).finish(),
            ServerOption::Logger(_) => f.write_str("Logger(..)"),
            ServerOption::ReadTimeout(d) => f.debug_tuple("ReadTimeout").field(d).finish(),
            ServerOption::WriteTimeout(d) => f.debug_tuple("WriteTimeout").field(d).finish(),
            ServerOption::IdleTimeout(d) => f.debug_tuple("IdleTimeout").field(d).finish(),
            ServerOption::RequestDeadline(d) => f.debug_tuple("RequestDeadline").field(d).finish(),
            ServerOption::Tls(tls) => f.debug_tuple("Tls").field(tls).finish(),
            ServerOption::MaxBodySize(n) => f.debug_tuple("MaxBodySize").field(n).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Timeouts {
    read: Duration,
    write: Duration,
    idle: Duration,
}

/// HTTP server hosting a set of modules.
pub struct Server {
    address: SocketAddr,
    logger: SharedLogger,
    timeouts: Timeouts,
    deadline: Duration,
    tls: Option<TlsConfig>,
    max_body_size: usize,
    router: Router,
    mounted: Vec<String>,
}

impl Server {
    /// Apply `options` in order and validate the result.
    pub fn new(options: impl IntoIterator<Item = ServerOption>) -> Result<Self, ConfigurationError> {
        let mut address = DEFAULT_ADDRESS.to_string();
        let mut logger = None;
        let mut timeouts = Timeouts::default();
        let mut deadline = DEFAULT_REQUEST_DEADLINE;
        let mut tls = None;
        let mut max_body_size = DEFAULT_MAX_BODY_SIZE;

        for option in options {
            match option {
                ServerOption::Address(value) => address = value,
                ServerOption::Logger(value) => logger = Some(value),
                ServerOption::ReadTimeout(value) => timeouts.read = value,
                ServerOption::WriteTimeout(value) => timeouts.write = value,
                ServerOption::IdleTimeout(value) => timeouts.idle = value,
                ServerOption::RequestDeadline(value) => deadline = value,
                ServerOption::Tls(value) => tls = Some(value),
                ServerOption::MaxBodySize(value) => max_body_size = value,
            }
        }

        let logger = logger.ok_or(ConfigurationError::MissingLogger)?;
        let parsed = parse_bind_address(&address).map_err(|e| ConfigurationError::InvalidAddress {
            address: address.clone(),
            reason: e.to_string(),
        })?;
        if deadline.is_zero() {
            return Err(ConfigurationError::InvalidDeadline);
        }

        Ok(Self {
            address: parsed,
            logger,
            timeouts,
            deadline,
            tls,
            max_body_size,
            router: Router::new(),
            mounted: Vec::new(),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn logger(&self) -> &SharedLogger {
        &self.logger
    }

    pub fn request_deadline(&self) -> Duration {
        self.deadline
    }

    /// Prefixes mounted so far, in registration order.
    pub fn mounted_prefixes(&self) -> &[String] {
        &self.mounted
    }

    /// Mount `module` under `prefix`.
    ///
    /// The module receives its context path and, when it accepts one, the
    /// server logger before `initialize` runs. Each prefix owns its whole
    /// subtree: `/api/...` is answered only by the `/api` module, and the root
    /// module only sees paths no other prefix claims.
    ///
    /// A failed `initialize`, or a route declaration axum rejects, mounts
    /// nothing and clears the module's context path so it can be retried.
    pub fn register_module<M>(&mut self, prefix: &str, module: &mut M) -> Result<(), ServerError>
    where
        M: Module + ?Sized,
    {
        let prefix = normalize_prefix(prefix);

        if self.mounted.contains(&prefix) {
            return Err(ConfigurationError::DuplicatePrefix(prefix).into());
        }
        if !module.context_path().is_empty() {
            return Err(
                ConfigurationError::ModuleAlreadyMounted(module.context_path().to_string()).into(),
            );
        }

        module.set_context_path(&prefix);
        if let Some(logging) = module.logging() {
            logging.set_logger(Arc::clone(&self.logger));
        }

        // axum reports conflicting route declarations by panicking.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut scope = ModuleRouter::new(prefix.clone());
            module.initialize(&mut scope)?;
            Ok::<_, BoxError>(mount(self.router.clone(), &prefix, scope.into_router()))
        }))
        .unwrap_or_else(|err| Err(PanicPayload::classify(err.as_ref()).description().into()));

        match outcome {
            Ok(router) => self.router = router,
            Err(source) => {
                module.set_context_path("");
                tracing::error!(prefix = %prefix, error = %source, "Module failed to initialize");
                return Err(ServerError::ModuleInitialization { prefix, source });
            }
        }

        tracing::info!(prefix = %prefix, "Module registered");
        self.mounted.push(prefix);
        Ok(())
    }

    /// The routes of every mounted module, without the outer middleware.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Build the full request pipeline.
    ///
    /// Outermost first: request id, `nosniff`, metrics, deadline, body panic
    /// guard, panic recovery, trailing-slash normalization, then the module
    /// routes with tracing, body limit and body timeouts.
    pub fn handler_chain(&self) -> HandlerChain {
        let mut routes = self
            .router
            .clone()
            .layer(RequestBodyLimitLayer::new(self.max_body_size))
            .layer(TraceLayer::new_for_http());
        if !self.timeouts.read.is_zero() {
            routes = routes.layer(RequestBodyTimeoutLayer::new(self.timeouts.read));
        }
        if !self.timeouts.write.is_zero() {
            routes = routes.layer(ResponseBodyTimeoutLayer::new(self.timeouts.write));
        }

        let deadline = Deadline {
            duration: self.deadline,
            logger: Arc::clone(&self.logger),
        };

        let service = ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(propagate_request_id_layer())
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(from_fn(track_requests))
            .layer(from_fn_with_state(deadline, enforce_deadline))
            .layer(from_fn_with_state(
                Arc::clone(&self.logger),
                guard_response_body,
            ))
            .layer(recovery_layer(Arc::clone(&self.logger)))
            .service(NormalizePathLayer::trim_trailing_slash().layer(routes));

        BoxCloneSyncService::new(service)
    }

    /// Bind the configured address and serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.address).map_err(|source| ServerError::Bind {
            address: self.address.to_string(),
            source,
        })?;

        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.trigger();
        });

        self.serve(listener, receiver).await
    }

    /// Serve on an already bound listener until `shutdown` fires, then drain
    /// in-flight requests for a bounded grace period.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        listener.set_nonblocking(true).map_err(ServerError::Serve)?;
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;

        let handle = Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            // A closed channel also means shutdown.
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received, draining connections");
            drain.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        let app = Shared::new(
            self.handler_chain()
                .map_request(|request: axum::http::Request<Incoming>| request.map(Body::new)),
        );
        let idle = self.timeouts.idle;

        let result = match &self.tls {
            Some(tls) => {
                let config = load_tls_config(tls).await.map_err(ServerError::Tls)?;
                tracing::info!(address = %local_addr, "HTTPS server starting");
                let mut server = axum_server::from_tcp_rustls(listener, config);
                configure_http(server.http_builder(), idle);
                server.handle(handle).serve(app).await
            }
            None => {
                tracing::info!(address = %local_addr, "HTTP server starting");
                let mut server = axum_server::from_tcp(listener);
                configure_http(server.http_builder(), idle);
                server.handle(handle).serve(app).await
            }
        };

        result.map_err(ServerError::Serve)?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("address", &self.address)
            .field("deadline", &self.deadline)
            .field("timeouts", &self.timeouts)
            .field("tls", &self.tls.is_some())
            .field("max_body_size", &self.max_body_size)
            .field("mounted", &self.mounted)
            .finish()
    }
}

/// The root module answers whatever no prefixed module claims.
fn mount(router: Router, prefix: &str, scoped: Router) -> Router {
    if prefix == "/" {
        router.fallback_service(scoped)
    } else {
        router.nest_service(prefix, scoped)
    }
}

fn configure_http(builder: &mut HttpBuilder<TokioExecutor>, idle: Duration) {
    if !idle.is_zero() {
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(idle);
    }
}
