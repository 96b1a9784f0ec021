//! Bybit V5 REST client for the execution and closed-PnL history endpoints.
//!
//! Requests are signed with HMAC-SHA256 over
//! `{timestamp}{api_key}{recv_window}{query_string}` per the V5 scheme.
//! A venue-reported application error (`retCode != 0` inside a 200
//! response) is logged and surfaced as an empty page so the caller's
//! cursor walk stops as if exhausted.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error};

use crate::config::BybitConfig;
use crate::error::{CarryError, Result};

type HmacSha256 = Hmac<Sha256>;

/// One raw row from `/v5/execution/list`. Bybit returns numbers as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBybitExecution {
    #[serde(default, rename = "execTime")]
    pub exec_time: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, rename = "execType")]
    pub exec_type: String,
    #[serde(default, rename = "execFee")]
    pub exec_fee: String,
    #[serde(default, rename = "execId")]
    pub exec_id: String,
    #[serde(default, rename = "orderId")]
    pub order_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default, rename = "execQty")]
    pub exec_qty: String,
    #[serde(default, rename = "execPrice")]
    pub exec_price: String,
    #[serde(default, rename = "closedPnl")]
    pub closed_pnl: String,
}

/// One raw row from `/v5/position/closed-pnl`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBybitClosedPnl {
    #[serde(default, rename = "updatedTime")]
    pub updated_time: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, rename = "orderId")]
    pub order_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub qty: String,
    #[serde(default, rename = "avgEntryPrice")]
    pub avg_entry_price: String,
    #[serde(default, rename = "closedPnl")]
    pub closed_pnl: String,
}

/// One page of a cursor-paginated list endpoint
#[derive(Debug, Clone)]
pub struct BybitPage<T> {
    pub list: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> BybitPage<T> {
    pub fn empty() -> Self {
        Self {
            list: Vec::new(),
            next_cursor: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default, rename = "retCode")]
    ret_code: i64,
    #[serde(default, rename = "retMsg")]
    ret_msg: String,
    result: Option<ResultPayload<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ResultPayload<T> {
    #[serde(default)]
    list: Vec<T>,
    #[serde(default, rename = "nextPageCursor")]
    next_page_cursor: Option<String>,
}

/// Page source the extractor drives; mocked in tests.
#[async_trait]
pub trait BybitApi: Send + Sync {
    /// Execution list for linear perpetuals, optionally scoped to one symbol.
    async fn executions(
        &self,
        start_ms: i64,
        end_ms: i64,
        symbol: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<BybitPage<RawBybitExecution>>;

    async fn closed_pnl(
        &self,
        start_ms: i64,
        end_ms: i64,
        cursor: Option<&str>,
    ) -> Result<BybitPage<RawBybitClosedPnl>>;
}

#[derive(Clone)]
pub struct BybitClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    recv_window: u64,
    page_limit: u32,
}

impl BybitClient {
    pub fn new(config: &BybitConfig, page_limit: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("carry-bybit/0.1")
            .build()
            .map_err(|e| {
                CarryError::Internal(format!("failed to build Bybit HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            recv_window: config.recv_window,
            page_limit,
        })
    }

    /// HMAC-SHA256 hex signature over the V5 signing payload
    fn sign(&self, timestamp_ms: i64, query: &str) -> Result<String> {
        let payload = format!(
            "{}{}{}{}",
            timestamp_ms, self.api_key, self.recv_window, query
        );

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| CarryError::Signature(format!("HMAC init failed: {}", e)))?;
        mac.update(payload.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn signed_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<BybitPage<T>> {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let timestamp = Utc::now().timestamp_millis();
        let signature = self.sign(timestamp, &query)?;
        let url = format!("{}{}?{}", self.base_url, endpoint, query);

        debug!("Bybit request: {}", url);

        let response = self
            .http
            .get(&url)
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", self.recv_window.to_string())
            .header("X-BAPI-SIGN", signature)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CarryError::VenueApi(format!(
                "Bybit HTTP error: {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        if envelope.ret_code != 0 {
            error!(
                "Bybit API error: {} - {}",
                envelope.ret_code, envelope.ret_msg
            );
            return Ok(BybitPage::empty());
        }

        Ok(envelope
            .result
            .map(|payload| BybitPage {
                list: payload.list,
                next_cursor: payload
                    .next_page_cursor
                    .filter(|cursor| !cursor.is_empty()),
            })
            .unwrap_or_else(BybitPage::empty))
    }

    fn base_params(&self, start_ms: i64, end_ms: i64) -> Vec<(&'static str, String)> {
        vec![
            ("category", "linear".to_string()),
            ("startTime", start_ms.to_string()),
            ("endTime", end_ms.to_string()),
            ("limit", self.page_limit.to_string()),
        ]
    }
}

#[async_trait]
impl BybitApi for BybitClient {
    async fn executions(
        &self,
        start_ms: i64,
        end_ms: i64,
        symbol: Option<&str>,
        cursor: Option<&str>,
    ) -> Result<BybitPage<RawBybitExecution>> {
        let mut params = self.base_params(start_ms, end_ms);
        if let Some(symbol) = symbol {
            params.push(("symbol", symbol.to_string()));
        }
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        self.signed_get("/v5/execution/list", &params).await
    }

    async fn closed_pnl(
        &self,
        start_ms: i64,
        end_ms: i64,
        cursor: Option<&str>,
    ) -> Result<BybitPage<RawBybitClosedPnl>> {
        let mut params = self.base_params(start_ms, end_ms);
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }

        self.signed_get("/v5/position/closed-pnl", &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BybitConfig;

    fn client() -> BybitClient {
        let config = BybitConfig {
            base_url: "https://api.bybit.com".to_string(),
            api_key: "test-key".to_string(),
            api_secret: "test-secret".to_string(),
            recv_window: 5000,
        };
        BybitClient::new(&config, 100).unwrap()
    }

    #[test]
    fn test_sign_is_hex_and_deterministic() {
        let client = client();
        let sig_a = client
            .sign(1_700_000_000_000, "category=linear&limit=100")
            .unwrap();
        let sig_b = client
            .sign(1_700_000_000_000, "category=linear&limit=100")
            .unwrap();

        assert_eq!(sig_a, sig_b);
        assert_eq!(sig_a.len(), 64);
        assert!(sig_a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sign_varies_with_query() {
        let client = client();
        let sig_a = client.sign(1_700_000_000_000, "cursor=a").unwrap();
        let sig_b = client.sign(1_700_000_000_000, "cursor=b").unwrap();
        assert_ne!(sig_a, sig_b);
    }

    #[test]
    fn test_envelope_error_code_parses() {
        let envelope: ApiEnvelope<RawBybitExecution> = serde_json::from_str(
            r#"{"retCode": 10003, "retMsg": "Invalid api key", "result": {}}"#,
        )
        .unwrap();
        assert_eq!(envelope.ret_code, 10003);
        assert!(envelope.result.unwrap().list.is_empty());
    }

    #[test]
    fn test_envelope_page_parses() {
        let envelope: ApiEnvelope<RawBybitExecution> = serde_json::from_str(
            r#"{
                "retCode": 0,
                "retMsg": "OK",
                "result": {
                    "list": [{"execId": "e1", "symbol": "ENAUSDT", "execType": "Trade"}],
                    "nextPageCursor": "page2"
                }
            }"#,
        )
        .unwrap();
        let payload = envelope.result.unwrap();
        assert_eq!(payload.list.len(), 1);
        assert_eq!(payload.list[0].exec_id, "e1");
        assert_eq!(payload.next_page_cursor.as_deref(), Some("page2"));
    }
}
