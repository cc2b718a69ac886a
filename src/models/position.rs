//! Open position on the slave account, as reported by the terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OrderType;

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Buy,
    Sell,
}

impl PositionSide {
    /// Market order type that flattens a position of this side.
    pub fn closing_order_type(&self) -> OrderType {
        match self {
            PositionSide::Buy => OrderType::Sell,
            PositionSide::Sell => OrderType::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Buy => "BUY",
            PositionSide::Sell => "SELL",
        }
    }
}

/// Live position. The position ticket equals the ticket of the order that
/// opened it, which is what the relay stores in its ticket map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Position ticket
    pub ticket: u64,

    /// Instrument symbol
    pub symbol: String,

    /// Long or short
    #[serde(rename = "type")]
    pub side: PositionSide,

    /// Open volume in lots
    pub volume: f64,

    /// Average open price
    #[serde(default)]
    pub price_open: f64,

    /// Identifying tag of the order that opened it
    #[serde(default)]
    pub magic: u64,

    /// Open time
    #[serde(with = "chrono::serde::ts_seconds", default = "Utc::now")]
    pub time: DateTime<Utc>,
}
