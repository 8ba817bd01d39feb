//! Startup error types.
//!
//! Every variant here is fatal: the binary reports it and exits non-zero
//! before a socket is opened. Per-request errors live next to the code that
//! produces them (`module::codec`, `session::error`, `view`).

use thiserror::Error;

pub use tower::BoxError;

/// Invalid or incomplete server configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("server logger has not been set")]
    MissingLogger,
    #[error("invalid bind address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("request deadline must be greater than zero")]
    InvalidDeadline,
    #[error("a module is already mounted at {0:?}")]
    DuplicatePrefix(String),
    #[error("module is already mounted at {0:?}")]
    ModuleAlreadyMounted(String),
}

/// Errors raised while assembling or starting a server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("module at {prefix:?} failed to initialize: {source}")]
    ModuleInitialization {
        prefix: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load TLS material: {0}")]
    Tls(#[source] std::io::Error),
    #[error("server terminated: {0}")]
    Serve(#[source] std::io::Error),
}
