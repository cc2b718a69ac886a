//! Signal relay: turns master signals into slave-side order operations.
//!
//! Every signal goes through the same gates before any terminal call:
//! 1. the shared secret must match,
//! 2. the terminal connection must be ready within the configured timeout.
//!
//! Then `action` selects one of:
//! - `OPEN`: size from balance, place a pending limit order, remember
//!   `master_ticket -> slave ticket`
//! - `CANCEL_PENDING`: remove every pending order on a symbol
//! - `CLOSE`: look up the slave ticket and flatten its position at market

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::TradingVenue;
use crate::models::{OrderRequest, PendingKind, SignalAction, SignalMessage};

use super::sizing::lot_for_account;
use super::{ConnectionGate, RelayConfig, RelayError, TicketMap};

/// Successful relay outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RelayOutcome {
    PendingCreated { slave_ticket: u64, lot: f64 },
    PendingCanceled { symbol: String, count: usize },
    Closed,
}

/// Relay state shared by all request handlers.
pub struct SignalRelay {
    config: RelayConfig,
    venue: Arc<dyn TradingVenue>,
    gate: Arc<ConnectionGate>,
    tickets: TicketMap,
}

impl SignalRelay {
    pub fn new(config: RelayConfig, venue: Arc<dyn TradingVenue>, gate: Arc<ConnectionGate>) -> Self {
        Self {
            config,
            venue,
            gate,
            tickets: TicketMap::new(),
        }
    }

    pub fn gate(&self) -> &ConnectionGate {
        &self.gate
    }

    pub fn tickets(&self) -> &TicketMap {
        &self.tickets
    }

    /// Authenticate, wait for the terminal, and run the requested action.
    pub async fn handle(&self, signal: &SignalMessage) -> Result<RelayOutcome, RelayError> {
        if signal.secret.as_deref() != Some(self.config.shared_secret.as_str()) {
            warn!(action = ?signal.action, "Rejected signal with bad secret");
            return Err(RelayError::Unauthorized);
        }

        self.gate.ensure_ready(self.config.ready_timeout).await?;

        let action = signal
            .action
            .as_deref()
            .and_then(|a| a.parse::<SignalAction>().ok());

        match action {
            Some(SignalAction::Open) => self.open(signal).await,
            Some(SignalAction::CancelPending) => self.cancel_pending(signal).await,
            Some(SignalAction::Close) => self.close(signal).await,
            None => Err(RelayError::UnknownAction(signal.action.clone())),
        }
    }

    async fn open(&self, signal: &SignalMessage) -> Result<RelayOutcome, RelayError> {
        let lot = lot_for_account(self.venue.as_ref()).await?;

        let kind = signal
            .order_type
            .as_deref()
            .and_then(|t| t.parse::<PendingKind>().ok())
            .ok_or_else(|| RelayError::InvalidOrderType(signal.order_type.clone()))?;

        // Everything the mapping needs is checked up front so a placed order
        // can always be recorded.
        let symbol = signal
            .symbol
            .as_deref()
            .ok_or_else(|| RelayError::missing_field("symbol"))?;
        let entry = signal.entry.ok_or_else(|| RelayError::missing_field("entry"))?;
        let master = signal
            .master_ticket
            .as_ref()
            .ok_or_else(|| RelayError::missing_field("master_ticket"))?;

        let request = OrderRequest::pending(
            symbol,
            lot,
            kind.order_type(),
            entry,
            self.config.deviation,
            self.config.magic,
        );

        let result = self
            .venue
            .send_order(&request)
            .await
            .map_err(|e| RelayError::OrderSendFailed(format!("{:#}", e)))?;

        if !result.is_done() {
            warn!(
                symbol = %symbol,
                retcode = %result.retcode,
                comment = %result.comment,
                "Pending order rejected"
            );
            return Err(RelayError::OrderRejected {
                retcode: result.retcode,
                comment: result.comment,
            });
        }

        if let Some(previous) = self.tickets.record(master.clone(), result.order).await {
            warn!(
                master_ticket = %master,
                previous,
                replacement = result.order,
                "Master ticket remapped; previous slave order is no longer tracked"
            );
        }

        info!(
            master_ticket = %master,
            slave_ticket = result.order,
            symbol = %symbol,
            order_type = kind.order_type().as_str(),
            entry,
            lot,
            "Pending order created"
        );

        Ok(RelayOutcome::PendingCreated {
            slave_ticket: result.order,
            lot,
        })
    }

    async fn cancel_pending(&self, signal: &SignalMessage) -> Result<RelayOutcome, RelayError> {
        let symbol = signal
            .symbol
            .as_deref()
            .ok_or_else(|| RelayError::missing_field("symbol"))?;

        let orders = self
            .venue
            .list_pending_orders(symbol)
            .await
            .with_context(|| format!("Failed to list pending orders for {}", symbol))?;

        // Each removal stands alone; a refused one is logged and skipped.
        let mut count = 0;
        for order in &orders {
            match self.venue.cancel_order(order.ticket).await {
                Ok(result) if result.is_done() => count += 1,
                Ok(result) => warn!(
                    ticket = order.ticket,
                    retcode = %result.retcode,
                    comment = %result.comment,
                    "Pending order removal refused"
                ),
                Err(e) => warn!(ticket = order.ticket, error = %e, "Pending order removal failed"),
            }
        }

        info!(symbol = %symbol, found = orders.len(), canceled = count, "Pending orders canceled");

        Ok(RelayOutcome::PendingCanceled {
            symbol: symbol.to_string(),
            count,
        })
    }

    async fn close(&self, signal: &SignalMessage) -> Result<RelayOutcome, RelayError> {
        let master = signal
            .master_ticket
            .as_ref()
            .ok_or_else(|| RelayError::missing_field("master_ticket"))?;

        let slave = self
            .tickets
            .lookup(master)
            .await
            .ok_or_else(|| RelayError::TicketNotFound(master.clone()))?;

        let position = self
            .venue
            .list_positions(slave)
            .await
            .with_context(|| format!("Failed to fetch position {}", slave))?
            .into_iter()
            .find(|p| p.ticket == slave)
            .ok_or(RelayError::PositionNotFound(slave))?;

        let request = OrderRequest::close(&position, self.config.deviation);
        let result = self
            .venue
            .send_order(&request)
            .await
            .map_err(|e| RelayError::OrderSendFailed(format!("{:#}", e)))?;

        if !result.is_done() {
            warn!(
                slave_ticket = slave,
                retcode = %result.retcode,
                comment = %result.comment,
                "Close rejected"
            );
            return Err(RelayError::CloseFailed {
                retcode: result.retcode,
                comment: result.comment,
            });
        }

        info!(
            master_ticket = %master,
            slave_ticket = slave,
            symbol = %position.symbol,
            side = position.side.as_str(),
            volume = position.volume,
            "Position closed"
        );

        Ok(RelayOutcome::Closed)
    }
}
