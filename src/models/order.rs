//! Trade requests sent to the terminal, their acknowledgements, and pending
//! orders as the terminal reports them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Position;

/// Kind of trade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    /// Immediate execution at market
    Deal,
    /// Place a pending order
    Pending,
    /// Remove a pending order
    Remove,
}

/// Order type understood by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Buy,
    Sell,
    BuyLimit,
    SellLimit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Buy => "BUY",
            OrderType::Sell => "SELL",
            OrderType::BuyLimit => "BUY_LIMIT",
            OrderType::SellLimit => "SELL_LIMIT",
        }
    }
}

/// Order lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// Good-till-cancelled
    Gtc,
}

/// Fill policy for partially executable volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FillPolicy {
    /// Keep the unfilled remainder working
    Return,
}

/// Terminal return code for a trade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetCode(pub u32);

impl RetCode {
    pub const REJECT: RetCode = RetCode(10006);
    pub const DONE: RetCode = RetCode(10009);
    pub const INVALID: RetCode = RetCode(10013);
    pub const INVALID_PRICE: RetCode = RetCode(10015);
    pub const POSITION_CLOSED: RetCode = RetCode(10036);

    pub fn is_done(&self) -> bool {
        *self == RetCode::DONE
    }
}

impl fmt::Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade request. Only the fields relevant to `action` are populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub action: TradeAction,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    /// Volume in lots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    /// Maximum price deviation in points
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation: Option<u32>,

    /// Identifying tag for orders placed by this relay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_time: Option<TimeInForce>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_filling: Option<FillPolicy>,

    /// Pending order ticket (for `Remove`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u64>,

    /// Position ticket being closed (for `Deal`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
}

impl OrderRequest {
    fn empty(action: TradeAction) -> Self {
        Self {
            action,
            symbol: None,
            volume: None,
            order_type: None,
            price: None,
            deviation: None,
            magic: None,
            type_time: None,
            type_filling: None,
            order: None,
            position: None,
        }
    }

    /// Good-till-cancelled pending order with return-on-partial-fill.
    pub fn pending(
        symbol: &str,
        volume: f64,
        order_type: OrderType,
        price: f64,
        deviation: u32,
        magic: u64,
    ) -> Self {
        Self {
            symbol: Some(symbol.to_string()),
            volume: Some(volume),
            order_type: Some(order_type),
            price: Some(price),
            deviation: Some(deviation),
            magic: Some(magic),
            type_time: Some(TimeInForce::Gtc),
            type_filling: Some(FillPolicy::Return),
            ..Self::empty(TradeAction::Pending)
        }
    }

    /// Removal of a pending order.
    pub fn remove(ticket: u64) -> Self {
        Self {
            order: Some(ticket),
            ..Self::empty(TradeAction::Remove)
        }
    }

    /// Market order flattening the whole of `position`.
    pub fn close(position: &Position, deviation: u32) -> Self {
        Self {
            symbol: Some(position.symbol.clone()),
            volume: Some(position.volume),
            order_type: Some(position.side.closing_order_type()),
            deviation: Some(deviation),
            position: Some(position.ticket),
            ..Self::empty(TradeAction::Deal)
        }
    }
}

/// Acknowledgement of a trade request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub retcode: RetCode,

    /// Order ticket, if one was placed
    #[serde(default)]
    pub order: u64,

    /// Deal ticket, if the request executed
    #[serde(default)]
    pub deal: u64,

    #[serde(default)]
    pub volume: f64,

    #[serde(default)]
    pub price: f64,

    /// Terminal comment
    #[serde(default)]
    pub comment: String,
}

impl OrderResult {
    pub fn is_done(&self) -> bool {
        self.retcode.is_done()
    }
}

/// Pending order on the slave account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub ticket: u64,

    pub symbol: String,

    #[serde(rename = "type")]
    pub order_type: OrderType,

    /// Remaining volume in lots
    pub volume: f64,

    /// Trigger price
    #[serde(default)]
    pub price_open: f64,

    #[serde(default)]
    pub magic: u64,

    /// Placement time
    #[serde(with = "chrono::serde::ts_seconds", default = "Utc::now")]
    pub time_setup: DateTime<Utc>,
}
