//! HTTP client for fetching leaderboard positions.
//!
//! The scheduler depends only on the `PositionSource` capability; the
//! concrete client POSTs to the venue's public leaderboard endpoint and
//! hands the raw payload to the normalizer untouched.

use crate::error::{SourceError, SourceResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Default leaderboard position endpoint.
pub const DEFAULT_API_URL: &str =
    "https://www.binance.com/bapi/futures/v1/public/future/leaderboard/getOtherPosition";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The endpoint rejects requests without a browser user-agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Request body for the position endpoint.
#[derive(Debug, Serialize)]
struct PositionRequest<'a> {
    #[serde(rename = "encryptedUid")]
    encrypted_uid: &'a str,
    #[serde(rename = "tradeType")]
    trade_type: &'static str,
}

/// Anything that can produce a raw position payload for an identifier.
///
/// The identifier is an opaque token; it is never validated here beyond
/// what the venue itself enforces.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn fetch_positions(&self, uid: &str) -> SourceResult<Value>;
}

/// Client for the venue's public leaderboard API.
pub struct LeaderboardClient {
    client: Client,
    api_url: String,
}

impl LeaderboardClient {
    /// Create a new client against the given endpoint URL.
    pub fn new(api_url: impl Into<String>) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }
}

#[async_trait]
impl PositionSource for LeaderboardClient {
    async fn fetch_positions(&self, uid: &str) -> SourceResult<Value> {
        debug!(url = %self.api_url, "Fetching leaderboard positions");

        let request = PositionRequest {
            encrypted_uid: uid,
            trade_type: "PERPETUAL",
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SourceError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Transport(format!("HTTP {status}: {body}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Transport(format!("Failed to parse response: {e}")))?;

        info!("Fetched leaderboard payload");
        Ok(payload)
    }
}
