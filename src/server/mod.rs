//! Inbound HTTP surface.

mod http;

pub use http::{serve, RelayServer};
