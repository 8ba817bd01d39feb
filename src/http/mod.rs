//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (axum-server)
//!     → request.rs (x-request-id stamped and echoed)
//!     → metrics
//!     → middleware/deadline.rs (503 after the server-wide deadline)
//!     → middleware/recovery.rs (panic → logged plain-text 500)
//!     → trailing-slash normalization
//!     → server.rs router: one nested scope per registered module
//!     → module handler
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{HandlerChain, Server, ServerOption};
