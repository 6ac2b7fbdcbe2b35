//! Ethereum JSON-RPC block source.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

use super::RecordSource;
use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::types::{BlockNumber, RawBlock};

/// Production [`RecordSource`] calling `eth_getBlockByNumber` with full transactions.
#[derive(Debug)]
pub struct JsonRpcSource {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl JsonRpcSource {
    /// Build a client for `config.rpc_url` with the configured request timeout
    pub fn new(config: &SourceConfig) -> Result<Self> {
        url::Url::parse(&config.rpc_url).map_err(|e| {
            Error::config("source.rpc_url", format!("invalid RPC URL: {}", e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.rpc_url.clone(),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RecordSource for JsonRpcSource {
    async fn fetch_block(&self, number: BlockNumber) -> Result<RawBlock> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": "eth_getBlockByNumber",
            "params": [format!("0x{number:x}"), true],
        });

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            // 429 and 5xx are the common cases; all are treated as transient
            return Err(Error::Rpc(format!(
                "HTTP {} fetching block {}",
                status, number
            )));
        }

        let body = response.bytes().await?;
        let envelope: RpcResponse = serde_json::from_slice(&body).map_err(|e| {
            Error::Rpc(format!("invalid JSON-RPC response for block {}: {}", number, e))
        })?;

        if let Some(error) = envelope.error {
            return Err(Error::Rpc(format!(
                "code {}: {} (block {})",
                error.code, error.message, number
            )));
        }

        match envelope.result {
            None | Some(serde_json::Value::Null) => Err(Error::Rpc(format!(
                "block {} not available yet",
                number
            ))),
            Some(value) => serde_json::from_value(value).map_err(|e| Error::MalformedPayload {
                block: number,
                reason: e.to_string(),
            }),
        }
    }
}
