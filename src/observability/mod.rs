//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Framework internals:
//!     → tracing macros (structured fields)
//! Modules & recovery middleware:
//!     → logging::Logger capability → TracingLogger → tracing
//! Request pipeline:
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, testing, Logger, SharedLogger, TracingLogger};
