//! Hyperliquid info API client.
//!
//! The history endpoints are unauthenticated POSTs keyed by wallet address.
//! Raw payloads keep every field as it arrives; missing or malformed fields
//! default to empty so one bad row never rejects a page.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::HyperliquidConfig;
use crate::error::{CarryError, Result};

/// One raw fill from a `userFills` page. Numeric fields arrive as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHlFill {
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub coin: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub px: String,
    #[serde(default)]
    pub sz: String,
    #[serde(default)]
    pub fee: String,
    #[serde(default, rename = "closedPnl")]
    pub closed_pnl: String,
}

/// One raw funding row from a `userFunding` page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHlFunding {
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub delta: RawHlFundingDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHlFundingDelta {
    #[serde(default)]
    pub coin: String,
    #[serde(default)]
    pub szi: String,
    #[serde(default)]
    pub usdc: String,
    #[serde(default, rename = "fundingRate")]
    pub funding_rate: String,
}

/// Page source the extractor drives; mocked in tests.
#[async_trait]
pub trait HyperliquidApi: Send + Sync {
    async fn user_fills(&self, start_ms: i64, end_ms: i64) -> Result<Vec<RawHlFill>>;

    async fn user_funding(&self, start_ms: i64, end_ms: i64) -> Result<Vec<RawHlFunding>>;
}

#[derive(Clone)]
pub struct HyperliquidClient {
    http: reqwest::Client,
    base_url: String,
    user_address: String,
}

impl HyperliquidClient {
    pub fn new(config: &HyperliquidConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("carry-hyperliquid/0.1")
            .build()
            .map_err(|e| {
                CarryError::Internal(format!("failed to build Hyperliquid HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_address: config.user_address.clone(),
        })
    }

    async fn info_request<T: DeserializeOwned>(&self, body: serde_json::Value) -> Result<T> {
        let url = format!("{}/info", self.base_url);
        debug!("Hyperliquid request: {} {}", url, body["type"]);

        let response = self.http.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(CarryError::VenueApi(format!(
                "Hyperliquid HTTP error: {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl HyperliquidApi for HyperliquidClient {
    async fn user_fills(&self, start_ms: i64, end_ms: i64) -> Result<Vec<RawHlFill>> {
        self.info_request(json!({
            "type": "userFills",
            "user": self.user_address,
            "startTime": start_ms,
            "endTime": end_ms,
        }))
        .await
    }

    async fn user_funding(&self, start_ms: i64, end_ms: i64) -> Result<Vec<RawHlFunding>> {
        self.info_request(json!({
            "type": "userFunding",
            "user": self.user_address,
            "startTime": start_ms,
            "endTime": end_ms,
        }))
        .await
    }
}
