//! Data models for signals, account state, orders and positions.

mod account;
mod order;
mod position;
mod signal;

pub use account::AccountSnapshot;
pub use order::{Order, OrderRequest, OrderResult, OrderType, RetCode, TradeAction};
pub use position::Position;
#[cfg(test)]
pub use position::PositionSide;
pub use signal::{MasterTicket, PendingKind, SignalAction, SignalMessage};
