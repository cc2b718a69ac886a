//! Wire types specific to the terminal bridge API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Credentials forwarded to the terminal on `/initialize`.
#[derive(Clone, Serialize)]
pub struct TerminalLogin {
    pub login: u64,
    pub password: String,
    pub server: String,
}

impl fmt::Debug for TerminalLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalLogin")
            .field("login", &self.login)
            .field("password", &"***")
            .field("server", &self.server)
            .finish()
    }
}

/// Response from `/initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<LastError>,
}

/// Terminal's last error, as `/last_error` reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LastError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for LastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {:?})", self.code, self.message)
    }
}

/// Query string for `/orders`.
#[derive(Debug, Serialize)]
pub struct OrdersQuery<'a> {
    pub symbol: &'a str,
}

/// Query string for `/positions`.
#[derive(Debug, Serialize)]
pub struct PositionsQuery {
    pub ticket: u64,
}
