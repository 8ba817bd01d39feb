//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Define the `Logger` capability handed to modules by the server
//! - Provide the default `tracing`-backed logger
//!
//! # Design Decisions
//! - Framework internals log with `tracing` macros directly
//! - Modules and the recovery middleware only see the `Logger` trait
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and overridable with `RUST_LOG`

use std::fmt;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;

/// Severity-levelled log sink consumed by the server and its modules.
pub trait Logger: Send + Sync {
    fn trace(&self, value: &dyn fmt::Display);
    fn debug(&self, value: &dyn fmt::Display);
    fn info(&self, value: &dyn fmt::Display);
    fn warn(&self, value: &dyn fmt::Display);
    fn error(&self, value: &dyn fmt::Display);
}

/// Logger handle shared between the server and every registered module.
pub type SharedLogger = Arc<dyn Logger>;

/// Logger that forwards every call to `tracing`, tagged with a component name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: String,
}

impl TracingLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    /// Convenience constructor returning the logger already wrapped for sharing.
    pub fn shared(component: impl Into<String>) -> SharedLogger {
        Arc::new(Self::new(component))
    }
}

impl Logger for TracingLogger {
    fn trace(&self, value: &dyn fmt::Display) {
        tracing::trace!(component = %self.component, "{}", value);
    }

    fn debug(&self, value: &dyn fmt::Display) {
        tracing::debug!(component = %self.component, "{}", value);
    }

    fn info(&self, value: &dyn fmt::Display) {
        tracing::info!(component = %self.component, "{}", value);
    }

    fn warn(&self, value: &dyn fmt::Display) {
        tracing::warn!(component = %self.component, "{}", value);
    }

    fn error(&self, value: &dyn fmt::Display) {
        tracing::error!(component = %self.component, "{}", value);
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this twice is harmless:
/// the second installation attempt is ignored.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("fx_server={level},tower_http={level}", level = config.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}

/// In-memory logger for asserting on what the server and modules log.
pub mod testing {
    use super::*;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    type Entries = Vec<(&'static str, String)>;

    /// Logger that records every call for assertions.
    #[derive(Default)]
    pub struct RecordingLogger {
        entries: Mutex<Entries>,
    }

    impl RecordingLogger {
        pub fn count(&self, level: &str) -> usize {
            self.entries().iter().filter(|(l, _)| *l == level).count()
        }

        /// Messages logged at `level`, oldest first.
        pub fn messages(&self, level: &str) -> Vec<String> {
            self.entries()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }

        fn entries(&self) -> MutexGuard<'_, Entries> {
            // A panicking test thread must not hide what was logged before it.
            self.entries.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn push(&self, level: &'static str, value: &dyn fmt::Display) {
            self.entries().push((level, value.to_string()));
        }
    }

    impl Logger for RecordingLogger {
        fn trace(&self, value: &dyn fmt::Display) {
            self.push("trace", value);
        }
        fn debug(&self, value: &dyn fmt::Display) {
            self.push("debug", value);
        }
        fn info(&self, value: &dyn fmt::Display) {
            self.push("info", value);
        }
        fn warn(&self, value: &dyn fmt::Display) {
            self.push("warn", value);
        }
        fn error(&self, value: &dyn fmt::Display) {
            self.push("error", value);
        }
    }
}
