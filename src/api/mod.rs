//! Trading terminal access: the venue capability and its implementations.

mod bridge_client;
mod paper;
mod types;
mod venue;

pub use bridge_client::BridgeClient;
pub use paper::{PaperConfig, PaperVenue};
pub use types::TerminalLogin;
pub use venue::TradingVenue;
