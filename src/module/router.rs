//! Isolated route scope handed to a module during `initialize`.

use std::convert::Infallible;

use axum::{
    extract::Request,
    response::IntoResponse,
    routing::{MethodRouter, Route},
    Router,
};
use tower::{Layer, Service};

/// Routes declared by a single module, relative to its mount prefix.
///
/// Paths are written as if the module were mounted at `/`; the server nests
/// the finished scope under the module's prefix.
pub struct ModuleRouter {
    prefix: String,
    inner: Router,
}

impl ModuleRouter {
    pub(crate) fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            inner: Router::new(),
        }
    }

    /// The prefix this scope will be mounted under.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Add a route. An empty path is the module root.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        let path = scoped_path(path);
        self.inner = std::mem::take(&mut self.inner).route(&path, method_router);
        self
    }

    /// Merge a router (typically one with its state already applied).
    pub fn merge(&mut self, router: Router) -> &mut Self {
        self.inner = std::mem::take(&mut self.inner).merge(router);
        self
    }

    /// Mount a service (e.g. a static file server) under a sub-path.
    pub fn nest_service<T>(&mut self, path: &str, service: T) -> &mut Self
    where
        T: Service<Request, Error = Infallible> + Clone + Send + Sync + 'static,
        T::Response: IntoResponse,
        T::Future: Send + 'static,
    {
        let path = scoped_path(path);
        self.inner = std::mem::take(&mut self.inner).nest_service(&path, service);
        self
    }

    /// Handler for requests under this prefix that match no route.
    pub fn fallback(&mut self, method_router: MethodRouter) -> &mut Self {
        self.inner = std::mem::take(&mut self.inner).fallback_service(method_router);
        self
    }

    /// Wrap every route declared so far in `layer`.
    pub fn layer<L>(&mut self, layer: L) -> &mut Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        self.inner = std::mem::take(&mut self.inner).layer(layer);
        self
    }

    pub(crate) fn into_router(self) -> Router {
        self.inner
    }
}

fn scoped_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("/{}", trimmed.trim_end_matches('/'))
    }
}

/// Normalize a mount prefix: leading slash, no trailing slash, `/` for root.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}
