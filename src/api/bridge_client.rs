//! HTTP client for a terminal bridge: a small service running next to the
//! trading terminal that exposes its order API as JSON over HTTP.
//!
//! Endpoints:
//! - `POST /initialize`, `POST /shutdown`
//! - `GET /account`, `GET /last_error`
//! - `POST /order_send` (body: [`OrderRequest`], answer: result or `null`)
//! - `GET /orders?symbol=`, `GET /positions?ticket=` (array or `null`)

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{AccountSnapshot, Order, OrderRequest, OrderResult, Position};

use super::types::{InitializeResponse, LastError, OrdersQuery, PositionsQuery, TerminalLogin};
use super::TradingVenue;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Terminal bridge client.
pub struct BridgeClient {
    client: Client,
    base_url: String,
    login: Option<TerminalLogin>,
}

impl BridgeClient {
    /// Create a client for the bridge at `base_url`.
    pub fn new(base_url: &str, login: Option<TerminalLogin>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            login,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the terminal's last error.
    pub async fn last_error(&self) -> Result<LastError> {
        let url = format!("{}/last_error", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch last error")?;

        Self::read_json::<LastError>(response, "Last error")
            .await?
            .context("Bridge returned no last error")
    }

    /// Last error rendered for a failure message; never fails itself.
    async fn describe_last_error(&self) -> String {
        match self.last_error().await {
            Ok(e) => e.to_string(),
            Err(e) => format!("last error unavailable: {e:#}"),
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<Option<T>> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} request failed: {} - {}", what, status, body);
        }

        response
            .json::<Option<T>>()
            .await
            .with_context(|| format!("Failed to parse {} response", what.to_lowercase()))
    }
}

#[async_trait]
impl TradingVenue for BridgeClient {
    async fn connect(&self) -> Result<()> {
        let url = format!("{}/initialize", self.base_url);
        debug!(url = %url, "Initializing terminal");

        let mut request = self.client.post(&url);
        if let Some(login) = &self.login {
            request = request.json(login);
        }

        let response = request.send().await.context("Failed to reach terminal bridge")?;
        let init: InitializeResponse = Self::read_json(response, "Initialize")
            .await?
            .context("Bridge returned an empty initialize response")?;

        if !init.ok {
            let detail = init.error.map(|e| e.to_string()).unwrap_or_default();
            anyhow::bail!("Terminal initialize failed {}", detail);
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let url = format!("{}/shutdown", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to reach terminal bridge")?;

        if !response.status().is_success() {
            anyhow::bail!("Shutdown request failed: {}", response.status());
        }
        Ok(())
    }

    async fn account_snapshot(&self) -> Result<AccountSnapshot> {
        let url = format!("{}/account", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch account info")?;

        match Self::read_json::<AccountSnapshot>(response, "Account").await? {
            Some(account) => Ok(account),
            None => anyhow::bail!("No account info: {}", self.describe_last_error().await),
        }
    }

    async fn send_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        let url = format!("{}/order_send", self.base_url);
        debug!(action = ?request.action, symbol = ?request.symbol, "Sending order");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send order to terminal bridge")?;

        match Self::read_json::<OrderResult>(response, "Order send").await? {
            Some(result) => Ok(result),
            None => {
                let detail = self.describe_last_error().await;
                warn!(detail = %detail, "Terminal returned no order result");
                anyhow::bail!("order_send returned no result: {}", detail)
            }
        }
    }

    async fn list_pending_orders(&self, symbol: &str) -> Result<Vec<Order>> {
        let url = format!("{}/orders", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&OrdersQuery { symbol })
            .send()
            .await
            .context("Failed to fetch pending orders")?;

        // The terminal answers `null` both for "none" and for errors, so an
        // absent list reads as empty.
        Ok(Self::read_json::<Vec<Order>>(response, "Orders")
            .await?
            .unwrap_or_default())
    }

    async fn list_positions(&self, ticket: u64) -> Result<Vec<Position>> {
        let url = format!("{}/positions", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&PositionsQuery { ticket })
            .send()
            .await
            .context("Failed to fetch positions")?;

        Ok(Self::read_json::<Vec<Position>>(response, "Positions")
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderType, RetCode};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_order_parses_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/order_send"))
            .and(body_partial_json(json!({"action": "PENDING", "type": "SELL_LIMIT", "magic": 86421357})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "retcode": 10009,
                "order": 777,
                "comment": "Request executed"
            })))
            .mount(&server)
            .await;

        let client = BridgeClient::new(&server.uri(), None).unwrap();
        let request = OrderRequest::pending("GBPUSD", 0.05, OrderType::SellLimit, 1.27, 20, 86421357);
        let result = client.send_order(&request).await.unwrap();

        assert_eq!(result.retcode, RetCode::DONE);
        assert_eq!(result.order, 777);
    }

    #[tokio::test]
    async fn test_null_order_result_carries_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/order_send"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/last_error"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": -10004,
                "message": "No IPC connection"
            })))
            .mount(&server)
            .await;

        let client = BridgeClient::new(&server.uri(), None).unwrap();
        let err = client.send_order(&OrderRequest::remove(1)).await.unwrap_err();

        assert!(err.to_string().contains("-10004"));
        assert!(err.to_string().contains("No IPC connection"));
    }

    #[tokio::test]
    async fn test_null_orders_read_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders"))
            .and(query_param("symbol", "EURUSD"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let client = BridgeClient::new(&server.uri(), None).unwrap();
        let orders = client.list_pending_orders("EURUSD").await.unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/initialize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "error": {"code": -6, "message": "Terminal: Authorization failed"}
            })))
            .mount(&server)
            .await;

        let client = BridgeClient::new(&format!("{}/", server.uri()), None).unwrap();
        let err = client.connect().await.unwrap_err();
        assert!(err.to_string().contains("Authorization failed"));
    }

    #[tokio::test]
    async fn test_http_error_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account"))
            .respond_with(ResponseTemplate::new(503).set_body_string("terminal busy"))
            .mount(&server)
            .await;

        let client = BridgeClient::new(&server.uri(), None).unwrap();
        let err = client.account_snapshot().await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
