//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → ServerOption list for the server, SessionConfig/WebConfig for web modules
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no process-global session state
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ServerConfig;
pub use schema::{
    LimitsConfig, ListenerConfig, ObservabilityConfig, SessionConfig, TimeoutConfig, TlsConfig,
    WebConfig,
};
pub use validation::ValidationError;
