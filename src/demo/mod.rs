//! Sample modules wired up by the binary.

pub mod accounts;
pub mod pets;
