//! Failure-containment middleware wrapped around every module.

pub mod deadline;
pub mod recovery;

pub use deadline::{enforce_deadline, Deadline, TIMEOUT_MESSAGE};
pub use recovery::{guard_response_body, recovery_layer, GuardedBody, PanicPayload, PanicResponder};
