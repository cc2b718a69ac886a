//! Lot sizing from the slave account balance.
//!
//! `lot = max(0.01, round_half_up(balance / 10000 / 2, 2))`, computed in
//! exact decimal arithmetic and only converted to `f64` for the terminal.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::debug;

use crate::api::TradingVenue;

use super::RelayError;

/// Smallest tradable volume; smaller sizes are raised to it.
pub const MIN_VOLUME: Decimal = dec!(0.01);

/// Balance backing one lot.
const BALANCE_PER_LOT: Decimal = dec!(10000);

/// Fraction of the per-lot size actually used.
const RISK_DIVISOR: Decimal = dec!(2);

/// Lot granularity in decimal places.
const LOT_DECIMALS: u32 = 2;

/// Volume for a given balance, in lots.
pub fn volume_for_balance(balance: Decimal) -> Decimal {
    let raw = balance / BALANCE_PER_LOT / RISK_DIVISOR;
    raw.round_dp_with_strategy(LOT_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        .max(MIN_VOLUME)
}

/// Fetch a fresh account snapshot and size an order from its balance.
pub async fn lot_for_account(venue: &dyn TradingVenue) -> Result<f64, RelayError> {
    let account = venue
        .account_snapshot()
        .await
        .map_err(|e| RelayError::AccountUnavailable(format!("{:#}", e)))?;

    let volume = volume_for_balance(account.balance);
    debug!(balance = %account.balance, volume = %volume, "Sized order from balance");

    volume
        .to_f64()
        .ok_or_else(|| RelayError::Exception(format!("lot size {} is not representable", volume)))
}
