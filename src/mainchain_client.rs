//! Mainchain REST Client Module
//!
//! This module provides a client for fetching claim transactions from a
//! Cosmos SDK based mainchain node via its REST (LCD) API.
//!
//! ## Features
//!
//! - Fetch a transaction by hash (`/cosmos/tx/v1beta1/txs/{hash}`)
//! - Extract the result code, memo and signer used to validate claims

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::ClaimError;

// Cosmos REST encodes int64 fields as strings
fn deserialize_u64_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => s.parse().map_err(D::Error::custom),
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("expected unsigned height, got {}", n))),
        _ => Err(D::Error::custom(format!(
            "expected string or number for height, got: {:?}",
            value
        ))),
    }
}

// ============================================================================
// API RESPONSE STRUCTURES
// ============================================================================

/// Response of `GET /cosmos/tx/v1beta1/txs/{hash}`
#[derive(Debug, Deserialize)]
pub struct GetTxResponse {
    #[serde(default)]
    pub tx: Option<TxEnvelope>,
    #[serde(default)]
    pub tx_response: Option<TxResponse>,
}

#[derive(Debug, Deserialize)]
pub struct TxEnvelope {
    pub body: TxBody,
}

#[derive(Debug, Deserialize)]
pub struct TxBody {
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Deserialize)]
pub struct TxResponse {
    #[serde(deserialize_with = "deserialize_u64_string")]
    pub height: u64,
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
}

/// Mainchain transaction as seen by the claim validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainchainTx {
    /// Hash the transaction was requested by
    pub hash: String,
    pub height: u64,
    /// Result code, 0 on success
    pub code: u32,
    pub memo: String,
    /// Bech32 address of the first message's signer
    pub signer: String,
}

// ============================================================================
// CLIENT INTERFACE
// ============================================================================

/// Source of mainchain transactions.
#[async_trait]
pub trait MainchainClient: Send + Sync {
    /// Fetches a transaction by hash; unknown hashes fail with `ClaimError::Mainchain`.
    async fn fetch_tx(&self, hash: &str) -> Result<MainchainTx, ClaimError>;
}

// ============================================================================
// REST CLIENT IMPLEMENTATION
// ============================================================================

/// Client for a mainchain node's REST API
pub struct RestMainchainClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the REST endpoint (e.g., "http://127.0.0.1:1317")
    base_url: String,
}

impl RestMainchainClient {
    /// Creates a new mainchain client for the given REST URL
    ///
    /// # Arguments
    ///
    /// * `rest_url` - Base URL of the node's REST endpoint
    /// * `timeout_ms` - Per-request timeout in milliseconds
    ///
    /// # Returns
    ///
    /// * `Ok(RestMainchainClient)` - Successfully created client
    /// * `Err(anyhow::Error)` - Failed to create client
    pub fn new(rest_url: &str, timeout_ms: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: rest_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Signer of a Cosmos message: the delegator for distribution/staking
/// messages, the sender for bank transfers.
fn message_signer(message: &serde_json::Value) -> Option<String> {
    ["delegator_address", "from_address"]
        .iter()
        .find_map(|field| message.get(field).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl MainchainClient for RestMainchainClient {
    async fn fetch_tx(&self, hash: &str) -> Result<MainchainTx, ClaimError> {
        let url = format!("{}/cosmos/tx/v1beta1/txs/{}", self.base_url, hash);
        debug!("Fetching mainchain tx {}", hash);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClaimError::Mainchain(format!("failed to query tx {}: {}", hash, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClaimError::Mainchain(format!("tx {} not found", hash)));
        }
        let response = response
            .error_for_status()
            .map_err(|e| ClaimError::Mainchain(format!("tx {} query failed: {}", hash, e)))?;

        let body: GetTxResponse = response.json().await.map_err(|e| {
            ClaimError::Mainchain(format!("failed to parse tx {} response: {}", hash, e))
        })?;

        let tx_response = body
            .tx_response
            .ok_or_else(|| ClaimError::Mainchain(format!("tx {} not found", hash)))?;
        let (memo, signer) = match body.tx {
            Some(tx) => {
                let signer = tx.body.messages.first().and_then(message_signer);
                (tx.body.memo, signer.unwrap_or_default())
            }
            None => (String::new(), String::new()),
        };

        debug!(
            "Mainchain tx {} at height {} (code {}, hash {})",
            hash, tx_response.height, tx_response.code, tx_response.txhash
        );

        Ok(MainchainTx {
            hash: hash.to_string(),
            height: tx_response.height,
            code: tx_response.code,
            memo,
            signer,
        })
    }
}
