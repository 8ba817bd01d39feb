//! Server-side HTML views.
//!
//! # Data Flow
//! ```text
//! handler
//!     → LayoutView::render(session, data)
//!         → FlashMessages::take (always consumed)
//!         → WebModule::logged_in_user
//!         → ViewData { paths, user, date, messages, data }
//!     → minijinja template → Html<String>
//! ```

pub mod data;
pub mod render;
pub mod templates;

pub use data::ViewData;
pub use render::{LayoutView, SimpleView};
pub use templates::Templates;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "View rendering failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}
