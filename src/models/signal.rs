//! Inbound signal payload from the master side.
//!
//! Every field is parsed leniently: a field of the wrong JSON type reads as
//! absent instead of failing the whole payload, so a bad `entry` on a
//! `CANCEL_PENDING` signal (which never reads it) is harmless and a
//! non-string `secret` is simply unauthorized.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::OrderType;

/// Relay operation requested by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Place a pending limit order
    Open,
    /// Remove every pending order on a symbol
    CancelPending,
    /// Flatten the position opened for a master ticket
    Close,
}

impl FromStr for SignalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "CANCEL_PENDING" => Ok(Self::CancelPending),
            "CLOSE" => Ok(Self::Close),
            other => Err(other.to_string()),
        }
    }
}

/// Pending order kinds a master may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    BuyLimit,
    SellLimit,
}

impl PendingKind {
    pub fn order_type(&self) -> OrderType {
        match self {
            PendingKind::BuyLimit => OrderType::BuyLimit,
            PendingKind::SellLimit => OrderType::SellLimit,
        }
    }
}

impl FromStr for PendingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY_LIMIT" => Ok(Self::BuyLimit),
            "SELL_LIMIT" => Ok(Self::SellLimit),
            other => Err(other.to_string()),
        }
    }
}

/// Master-side order identifier. Opaque; strings and numbers are kept
/// apart so `"42"` and `42` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MasterTicket {
    Text(String),
    /// Canonical JSON rendering of a numeric identifier
    Number(String),
}

impl MasterTicket {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s)),
            Value::Number(n) => Some(Self::Number(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for MasterTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MasterTicket::Text(s) | MasterTicket::Number(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MasterTicket {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<u64> for MasterTicket {
    fn from(n: u64) -> Self {
        Self::Number(n.to_string())
    }
}

/// Webhook payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalMessage {
    /// Shared secret
    #[serde(default, deserialize_with = "lenient_string")]
    pub secret: Option<String>,

    /// OPEN, CANCEL_PENDING or CLOSE
    #[serde(default, deserialize_with = "lenient_string")]
    pub action: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: Option<String>,

    /// Pending order price, as a number or a numeric string
    #[serde(default, deserialize_with = "lenient_price")]
    pub entry: Option<f64>,

    /// BUY_LIMIT or SELL_LIMIT
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub order_type: Option<String>,

    #[serde(default, deserialize_with = "lenient_ticket")]
    pub master_ticket: Option<MasterTicket>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|p| p.is_finite()),
        _ => None,
    })
}

fn lenient_ticket<'de, D>(deserializer: D) -> Result<Option<MasterTicket>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(MasterTicket::from_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_signal() {
        let json = r#"{
            "secret": "X",
            "action": "OPEN",
            "symbol": "EURUSD",
            "type": "BUY_LIMIT",
            "entry": 1.1000,
            "master_ticket": "m1"
        }"#;

        let signal: SignalMessage = serde_json::from_str(json).unwrap();
        assert_eq!(signal.secret.as_deref(), Some("X"));
        assert_eq!(signal.action.as_deref(), Some("OPEN"));
        assert_eq!(signal.order_type.as_deref(), Some("BUY_LIMIT"));
        assert_eq!(signal.entry, Some(1.1));
        assert_eq!(signal.master_ticket, Some(MasterTicket::from("m1")));
    }

    #[test]
    fn test_entry_accepts_numeric_string() {
        let signal: SignalMessage = serde_json::from_str(r#"{"entry": " 2034.55 "}"#).unwrap();
        assert_eq!(signal.entry, Some(2034.55));

        let signal: SignalMessage = serde_json::from_str(r#"{"entry": "abc"}"#).unwrap();
        assert_eq!(signal.entry, None);
    }

    #[test]
    fn test_wrong_types_read_as_absent() {
        let signal: SignalMessage =
            serde_json::from_str(r#"{"secret": 123, "action": ["OPEN"], "master_ticket": null}"#)
                .unwrap();
        assert!(signal.secret.is_none());
        assert!(signal.action.is_none());
        assert!(signal.master_ticket.is_none());
    }

    #[test]
    fn test_numeric_and_text_tickets_are_distinct() {
        let a: SignalMessage = serde_json::from_str(r#"{"master_ticket": 42}"#).unwrap();
        let b: SignalMessage = serde_json::from_str(r#"{"master_ticket": "42"}"#).unwrap();

        assert_eq!(a.master_ticket, Some(MasterTicket::from(42u64)));
        assert_ne!(a.master_ticket, b.master_ticket);
        assert_eq!(a.master_ticket.unwrap().to_string(), "42");
    }

    #[test]
    fn test_action_and_kind_parsing() {
        assert_eq!("CANCEL_PENDING".parse::<SignalAction>(), Ok(SignalAction::CancelPending));
        assert!("open".parse::<SignalAction>().is_err());
        assert_eq!("SELL_LIMIT".parse::<PendingKind>().unwrap().order_type(), OrderType::SellLimit);
        assert!("BUY_STOP".parse::<PendingKind>().is_err());
    }
}
