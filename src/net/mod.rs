//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! bind address (config / ServerOption)
//!     → parse_bind_address (":port" shorthand expands to all interfaces)
//!     → std TcpListener
//!     → tls.rs (optional rustls acceptor)
//!     → Hand off to HTTP layer
//! ```

pub mod tls;

use std::net::{AddrParseError, SocketAddr};

/// Parse a bind address, accepting the `":8888"` shorthand for all interfaces.
pub fn parse_bind_address(address: &str) -> Result<SocketAddr, AddrParseError> {
    let address = address.trim();
    if address.starts_with(':') {
        format!("0.0.0.0{address}").parse()
    } else {
        address.parse()
    }
}
