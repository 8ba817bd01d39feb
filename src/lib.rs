//! Module-hosting HTTP server framework.
//!
//! A [`Server`] hosts independently written [`Module`](module::Module)s, each
//! mounted under its own path prefix, behind panic recovery and a
//! server-wide request deadline. Encoding modules speak JSON or XML; web
//! modules add cookie sessions, a login state machine, flash messages and
//! template views.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod module;
pub mod net;
pub mod observability;
pub mod session;
pub mod view;

pub use config::schema::ServerConfig;
pub use error::{BoxError, ConfigurationError, ServerError};
pub use http::{Server, ServerOption};
pub use lifecycle::Shutdown;
pub use observability::{Logger, SharedLogger, TracingLogger};
