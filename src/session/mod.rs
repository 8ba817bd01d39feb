//! Cookie-backed sessions, user binding, and flash messages.

pub mod error;
pub mod flash;
pub mod layer;
pub mod store;
pub mod user;
pub mod value;

pub use error::{PersistenceError, SessionError};
pub use flash::{FlashKind, FlashMessages};
pub use layer::session_layer;
pub use store::{ExtendableStore, SessionPersistence, UserExtension};
pub use user::{LookupError, UserId, UserResolver, WebUser};
pub use value::SessionValue;

pub use tower_sessions::{MemoryStore, Session};
