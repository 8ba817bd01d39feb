use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::session::user::LookupError;

/// The session store cannot provide what the web module needs.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(
        "error initializing session persistence: {store} does not expose a user extension point"
    )]
    Unsupported { store: &'static str },
}

/// Per-request session failure.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] tower_sessions::session::Error),
    #[error("user sessions have not been initialized")]
    UserSessionNotInitialized,
    #[error("session user binding has an unexpected shape: {0}")]
    InvalidUserBinding(String),
    #[error(transparent)]
    UserLookup(LookupError),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Session operation failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}
