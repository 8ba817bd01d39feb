//! Pluggable module contracts.
//!
//! # Data Flow
//! ```text
//! Application constructs module
//!     → Server::register_module(prefix, &mut module)
//!         → set_context_path(prefix)
//!         → logging() capability query → set_logger(server logger)
//!         → initialize(&mut ModuleRouter)   (routes relative to prefix)
//!     → scoped router owns prefix/* (root module: everything unclaimed)
//! ```
//!
//! # Design Decisions
//! - Minimal required trait plus an optional extended capability, discovered
//!   through `Module::logging()` instead of inheritance
//! - A module never sees the root router, so its routes cannot escape its prefix
//! - Concrete modules take their route declarations as a closure at construction

pub mod api;
pub mod codec;
pub mod router;
pub mod web;

pub use api::{ApiModule, JsonApiModule, XmlApiModule};
pub use codec::{Codec, DecodingError, EncodingError, Json, Xml};
pub use router::ModuleRouter;
pub use web::WebModule;

use crate::error::BoxError;
use crate::observability::SharedLogger;

/// The contract every pluggable unit satisfies.
pub trait Module: Send {
    /// Called by the server before `initialize`. A failed registration calls
    /// it again with an empty path so the module can be registered later.
    fn set_context_path(&mut self, context_path: &str);

    /// The prefix the module is mounted under; empty until registered.
    fn context_path(&self) -> &str;

    /// Declare the module's routes against its isolated scope.
    fn initialize(&mut self, router: &mut ModuleRouter) -> Result<(), BoxError>;

    /// Capability query for the extended logging contract.
    fn logging(&mut self) -> Option<&mut dyn ModuleLogging> {
        None
    }
}

/// Extended capability: modules that accept the server's logger.
pub trait ModuleLogging {
    fn set_logger(&mut self, logger: SharedLogger);
    fn logger(&self) -> Option<&SharedLogger>;
}

/// State shared by the concrete modules in this crate.
#[derive(Clone, Default)]
pub struct ModuleBase {
    context_path: String,
    logger: Option<SharedLogger>,
}

impl ModuleBase {
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Set once. An empty path clears it again.
    pub fn set_context_path(&mut self, context_path: &str) {
        if !self.context_path.is_empty() && !context_path.is_empty() {
            tracing::warn!(
                current = %self.context_path,
                requested = %context_path,
                "Ignoring second context path assignment"
            );
            return;
        }
        self.context_path = context_path.to_string();
    }

    pub fn logger(&self) -> Option<&SharedLogger> {
        self.logger.as_ref()
    }

    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.logger = Some(logger);
    }

    /// Build a path relative to the module's mount point.
    ///
    /// `base.path("/login")` is `"/auth/login"` for a module mounted at
    /// `/auth`, and `"/login"` for one mounted at the root.
    pub fn path(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        let base = self.context_path.trim_end_matches('/');
        if relative.is_empty() {
            if base.is_empty() {
                "/".to_string()
            } else {
                base.to_string()
            }
        } else {
            format!("{base}/{relative}")
        }
    }
}

impl std::fmt::Debug for ModuleBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleBase")
            .field("context_path", &self.context_path)
            .field("has_logger", &self.logger.is_some())
            .finish()
    }
}
