//! Relay failure kinds and their response bodies.

use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{MasterTicket, RetCode};

/// Every way a signal can fail. Each variant renders to a distinct
/// `{"error": ...}` body; none of them abort the request handler.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Secret missing or wrong.
    #[error("unauthorized")]
    Unauthorized,

    /// Terminal connection not ready in time.
    #[error("trading connection not ready: {0}")]
    NotReady(String),

    /// Account info could not be fetched for sizing.
    #[error("account info unavailable: {0}")]
    AccountUnavailable(String),

    /// `type` is not a supported pending order kind.
    #[error("invalid order type: {0:?}")]
    InvalidOrderType(Option<String>),

    /// The terminal gave no answer to an order request.
    #[error("order send failed: {0}")]
    OrderSendFailed(String),

    /// The terminal refused a pending order.
    #[error("order rejected: {retcode} {comment}")]
    OrderRejected { retcode: RetCode, comment: String },

    /// No slave ticket recorded for the master ticket.
    #[error("no slave ticket recorded for master ticket {0}")]
    TicketNotFound(MasterTicket),

    /// The mapped position is no longer open.
    #[error("no open position for slave ticket {0}")]
    PositionNotFound(u64),

    /// The terminal refused the closing deal.
    #[error("close failed: {retcode} {comment}")]
    CloseFailed { retcode: RetCode, comment: String },

    /// `action` is not one of the relay operations.
    #[error("unknown action: {0:?}")]
    UnknownAction(Option<String>),

    /// Anything else: malformed payloads, transport failures on queries.
    #[error("{0}")]
    Exception(String),
}

impl RelayError {
    /// Missing or unusable payload field.
    pub fn missing_field(field: &str) -> Self {
        Self::Exception(format!("missing or invalid field '{}'", field))
    }

    /// Machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            RelayError::Unauthorized => "unauthorized",
            RelayError::NotReady(_) => "not_ready",
            RelayError::AccountUnavailable(_) => "account_unavailable",
            RelayError::InvalidOrderType(_) => "invalid_order_type",
            RelayError::OrderSendFailed(_) => "order_send_failed",
            RelayError::OrderRejected { .. } => "order_rejected",
            RelayError::TicketNotFound(_) => "ticket_not_found",
            RelayError::PositionNotFound(_) => "position_not_found",
            RelayError::CloseFailed { .. } => "close_failed",
            RelayError::UnknownAction(_) => "unknown_action",
            RelayError::Exception(_) => "exception",
        }
    }

    /// Response body returned to the master.
    pub fn to_body(&self) -> Value {
        let code = self.error_code();
        match self {
            RelayError::NotReady(detail)
            | RelayError::AccountUnavailable(detail)
            | RelayError::OrderSendFailed(detail)
            | RelayError::Exception(detail) => json!({ "error": code, "detail": detail }),
            RelayError::OrderRejected { retcode, comment }
            | RelayError::CloseFailed { retcode, comment } => {
                json!({ "error": code, "retcode": retcode, "comment": comment })
            }
            RelayError::Unauthorized
            | RelayError::InvalidOrderType(_)
            | RelayError::TicketNotFound(_)
            | RelayError::PositionNotFound(_)
            | RelayError::UnknownAction(_) => json!({ "error": code }),
        }
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(err: anyhow::Error) -> Self {
        Self::Exception(format!("{:#}", err))
    }
}
