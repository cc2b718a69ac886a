//! Slave account state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time view of the slave account. Fetched fresh for every sizing
/// decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account number
    #[serde(default)]
    pub login: u64,

    /// Balance in deposit currency
    pub balance: Decimal,

    /// Balance plus floating P&L
    #[serde(default)]
    pub equity: Decimal,

    /// Margin available for new positions
    #[serde(default)]
    pub margin_free: Decimal,

    /// Account leverage (e.g. 100 for 1:100)
    #[serde(default)]
    pub leverage: u32,

    #[serde(default)]
    pub currency: String,
}

impl AccountSnapshot {
    /// Snapshot of a flat account holding only `balance`.
    pub fn flat(balance: Decimal, leverage: u32) -> Self {
        Self {
            login: 0,
            balance,
            equity: balance,
            margin_free: balance,
            leverage,
            currency: "USD".to_string(),
        }
    }
}
