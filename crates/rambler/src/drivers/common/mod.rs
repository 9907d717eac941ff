//! Common utilities shared across database drivers.
//!
//! - [`tls`]: TLS mode parsing and trust-material loading

pub mod tls;

pub use tls::{SslMode, TlsBuilder};
