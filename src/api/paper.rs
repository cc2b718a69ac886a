//! Paper venue: an in-memory terminal simulation.
//!
//! Pending orders rest until a test fills them into positions; position
//! tickets reuse the opening order's ticket, as on the real terminal. Used by
//! `serve --dry-run` and throughout the tests.

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::{AccountSnapshot, Order, OrderRequest, OrderResult, Position, RetCode, TradeAction};

use super::TradingVenue;

/// Paper venue configuration.
#[derive(Debug, Clone)]
pub struct PaperConfig {
    /// Starting account balance
    pub initial_balance: Decimal,

    /// First ticket handed out
    pub first_ticket: u64,

    /// Reported account leverage
    pub leverage: u32,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_balance: dec!(10000),
            first_ticket: 1,
            leverage: 100,
        }
    }
}

#[derive(Debug, Default)]
struct PaperState {
    connected: bool,
    balance: Decimal,
    next_ticket: u64,
    pending: BTreeMap<u64, Order>,
    positions: BTreeMap<u64, Position>,

    // Fault injection
    connect_failures: u32,
    send_failures: u32,
    unreachable: bool,
    reject_next: Option<(RetCode, String)>,
    sticky_orders: HashSet<u64>,

    // Observations
    connect_calls: u32,
    disconnect_calls: u32,
    position_queries: u32,
    sent: Vec<OrderRequest>,
}

/// Simulated terminal.
pub struct PaperVenue {
    config: PaperConfig,
    state: Mutex<PaperState>,
}

impl PaperVenue {
    pub fn new(config: PaperConfig) -> Self {
        let state = PaperState {
            balance: config.initial_balance,
            next_ticket: config.first_ticket,
            ..Default::default()
        };

        Self {
            config,
            state: Mutex::new(state),
        }
    }
}

impl PaperState {
    fn ensure_reachable(&self) -> Result<()> {
        if self.unreachable {
            anyhow::bail!("(-10004, \"No IPC connection\")");
        }
        if !self.connected {
            anyhow::bail!("(-10003, \"IPC initialize failed\")");
        }
        Ok(())
    }

    fn allocate_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    fn place_pending(&mut self, request: &OrderRequest) -> OrderResult {
        let (Some(symbol), Some(volume), Some(order_type), Some(price)) = (
            request.symbol.clone(),
            request.volume,
            request.order_type,
            request.price,
        ) else {
            return refused(RetCode::INVALID, "Invalid request");
        };
        if price <= 0.0 {
            return refused(RetCode::INVALID_PRICE, "Invalid price");
        }

        let ticket = self.allocate_ticket();
        self.pending.insert(
            ticket,
            Order {
                ticket,
                symbol,
                order_type,
                volume,
                price_open: price,
                magic: request.magic.unwrap_or_default(),
                time_setup: Utc::now(),
            },
        );

        OrderResult {
            retcode: RetCode::DONE,
            order: ticket,
            deal: 0,
            volume,
            price,
            comment: "Request executed".to_string(),
        }
    }

    fn remove_pending(&mut self, request: &OrderRequest) -> OrderResult {
        let Some(ticket) = request.order else {
            return refused(RetCode::INVALID, "Invalid request");
        };
        if self.sticky_orders.contains(&ticket) {
            return refused(RetCode::REJECT, "Request rejected");
        }

        match self.pending.remove(&ticket) {
            Some(order) => OrderResult {
                retcode: RetCode::DONE,
                order: ticket,
                deal: 0,
                volume: order.volume,
                price: 0.0,
                comment: "Request executed".to_string(),
            },
            None => refused(RetCode::INVALID, "Invalid request"),
        }
    }

    fn deal(&mut self, request: &OrderRequest) -> OrderResult {
        let Some(ticket) = request.position else {
            return refused(RetCode::INVALID, "Opening market deals are not simulated");
        };
        let Some(position) = self.positions.get(&ticket) else {
            return refused(RetCode::POSITION_CLOSED, "Position already closed");
        };
        if request.order_type != Some(position.side.closing_order_type()) {
            return refused(RetCode::INVALID, "Invalid request");
        }
        if request.volume != Some(position.volume) {
            return refused(RetCode::INVALID, "Invalid volume");
        }

        let volume = position.volume;
        let price = position.price_open;
        self.positions.remove(&ticket);
        let deal = self.allocate_ticket();

        OrderResult {
            retcode: RetCode::DONE,
            order: deal,
            deal,
            volume,
            price,
            comment: "Request executed".to_string(),
        }
    }
}

fn refused(retcode: RetCode, comment: &str) -> OrderResult {
    OrderResult {
        retcode,
        order: 0,
        deal: 0,
        volume: 0.0,
        price: 0.0,
        comment: comment.to_string(),
    }
}

// Fault injection and observation hooks for tests
#[cfg(test)]
impl PaperVenue {
    /// Fail the next `count` connection attempts.
    pub async fn fail_connects(&self, count: u32) {
        self.state.lock().await.connect_failures = count;
    }

    /// Fail the next `count` trade requests without an answer.
    pub async fn fail_sends(&self, count: u32) {
        self.state.lock().await.send_failures = count;
    }

    /// Make every call fail as if the terminal process were gone.
    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().await.unreachable = unreachable;
    }

    /// Refuse the next trade request with `retcode`.
    pub async fn reject_next(&self, retcode: RetCode, comment: &str) {
        self.state.lock().await.reject_next = Some((retcode, comment.to_string()));
    }

    /// Refuse every removal of pending order `ticket`.
    pub async fn make_sticky(&self, ticket: u64) {
        self.state.lock().await.sticky_orders.insert(ticket);
    }

    pub async fn set_balance(&self, balance: Decimal) {
        self.state.lock().await.balance = balance;
    }

    /// Trigger a resting pending order, turning it into an open position.
    pub async fn fill_pending(&self, ticket: u64) -> bool {
        use crate::models::{OrderType, PositionSide};

        let mut state = self.state.lock().await;
        let Some(order) = state.pending.remove(&ticket) else {
            return false;
        };

        let side = match order.order_type {
            OrderType::Buy | OrderType::BuyLimit => PositionSide::Buy,
            OrderType::Sell | OrderType::SellLimit => PositionSide::Sell,
        };
        state.positions.insert(
            ticket,
            Position {
                ticket,
                symbol: order.symbol,
                side,
                volume: order.volume,
                price_open: order.price_open,
                magic: order.magic,
                time: Utc::now(),
            },
        );
        true
    }

    /// Close a position outside the relay (manual close, stop-out).
    pub async fn drop_position(&self, ticket: u64) -> bool {
        self.state.lock().await.positions.remove(&ticket).is_some()
    }

    pub async fn pending_orders(&self) -> Vec<Order> {
        self.state.lock().await.pending.values().cloned().collect()
    }

    pub async fn open_positions(&self) -> Vec<Position> {
        self.state.lock().await.positions.values().cloned().collect()
    }

    /// Every trade request received so far, in order.
    pub async fn sent_requests(&self) -> Vec<OrderRequest> {
        self.state.lock().await.sent.clone()
    }

    pub async fn connect_calls(&self) -> u32 {
        self.state.lock().await.connect_calls
    }

    pub async fn disconnect_calls(&self) -> u32 {
        self.state.lock().await.disconnect_calls
    }

    pub async fn position_queries(&self) -> u32 {
        self.state.lock().await.position_queries
    }
}

#[async_trait]
impl TradingVenue for PaperVenue {
    async fn connect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.connect_calls += 1;

        if state.unreachable {
            anyhow::bail!("(-10004, \"No IPC connection\")");
        }
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            anyhow::bail!("(-10005, \"IPC timeout\")");
        }

        state.connected = true;
        info!(balance = %state.balance, attempt = state.connect_calls, "Paper terminal connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.disconnect_calls += 1;
        state.connected = false;
        debug!(disconnects = state.disconnect_calls, "Paper terminal disconnected");
        Ok(())
    }

    async fn account_snapshot(&self) -> Result<AccountSnapshot> {
        let state = self.state.lock().await;
        state.ensure_reachable()?;
        Ok(AccountSnapshot::flat(state.balance, self.config.leverage))
    }

    async fn send_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        let mut state = self.state.lock().await;
        state.sent.push(request.clone());
        state.ensure_reachable()?;

        if state.send_failures > 0 {
            state.send_failures -= 1;
            anyhow::bail!("(-10004, \"No IPC connection\")");
        }
        if let Some((retcode, comment)) = state.reject_next.take() {
            return Ok(refused(retcode, &comment));
        }

        Ok(match request.action {
            TradeAction::Pending => state.place_pending(request),
            TradeAction::Remove => state.remove_pending(request),
            TradeAction::Deal => state.deal(request),
        })
    }

    async fn list_pending_orders(&self, symbol: &str) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        state.ensure_reachable()?;
        Ok(state
            .pending
            .values()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn list_positions(&self, ticket: u64) -> Result<Vec<Position>> {
        let mut state = self.state.lock().await;
        state.position_queries += 1;
        debug!(ticket, queries = state.position_queries, "Paper position query");
        state.ensure_reachable()?;
        Ok(state.positions.get(&ticket).cloned().into_iter().collect())
    }
}
