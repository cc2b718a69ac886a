//! Relay logic: readiness gate, lot sizing, ticket mapping, dispatcher.

mod config;
mod dispatcher;
mod error;
mod gate;
pub mod sizing;
mod ticket_map;

pub use config::RelayConfig;
pub use dispatcher::SignalRelay;
pub use error::RelayError;
pub use gate::{ConnectionGate, GateState};
pub use ticket_map::TicketMap;
