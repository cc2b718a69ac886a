//! Capability interface to the trading terminal holding the slave account.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AccountSnapshot, Order, OrderRequest, OrderResult, Position};

/// Everything the relay needs from the terminal.
///
/// An `Err` from any method means the terminal produced no answer at all
/// (not reachable, not logged in, transport failure). A request the terminal
/// answered but refused comes back as `Ok` with a non-done [`OrderResult`].
#[async_trait]
pub trait TradingVenue: Send + Sync {
    /// Open the terminal connection.
    async fn connect(&self) -> Result<()>;

    /// Release the terminal connection.
    async fn disconnect(&self) -> Result<()>;

    /// Current account state.
    async fn account_snapshot(&self) -> Result<AccountSnapshot>;

    /// Submit a trade request.
    async fn send_order(&self, request: &OrderRequest) -> Result<OrderResult>;

    /// Pending orders on `symbol`.
    async fn list_pending_orders(&self, symbol: &str) -> Result<Vec<Order>>;

    /// Open positions with the given ticket (empty if none).
    async fn list_positions(&self, ticket: u64) -> Result<Vec<Position>>;

    /// Remove a single pending order.
    async fn cancel_order(&self, ticket: u64) -> Result<OrderResult> {
        self.send_order(&OrderRequest::remove(ticket)).await
    }
}
