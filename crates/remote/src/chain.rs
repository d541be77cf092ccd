//! JSON-RPC access to the chain collections are deployed on.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::RemoteError;

const SERVICE: &str = "chain rpc";

/// Direct chain reads, for state the subgraph may not have indexed yet.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Whether a contract is deployed at `address` (non-empty bytecode).
    async fn has_code(&self, address: &str) -> Result<bool, RemoteError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// `eth_getCode` answers `0x` for accounts without code.
fn is_deployed(code: &str) -> bool {
    let digits = code.strip_prefix("0x").unwrap_or(code);
    !digits.is_empty() && digits.bytes().any(|b| b != b'0')
}

fn decode_code(body: RpcResponse) -> Result<String, RemoteError> {
    if let Some(error) = body.error {
        return Err(RemoteError::Rpc {
            service: SERVICE,
            message: format!("{} ({})", error.message, error.code),
        });
    }
    body.result.ok_or_else(|| RemoteError::Decode {
        service: SERVICE,
        message: "response has neither result nor error".into(),
    })
}

#[derive(Clone)]
pub struct JsonRpcChain {
    client: reqwest::Client,
    rpc_url: String,
}

impl JsonRpcChain {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }
}

#[async_trait]
impl ChainReader for JsonRpcChain {
    async fn has_code(&self, address: &str) -> Result<bool, RemoteError> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "eth_getCode",
                "params": [address.to_lowercase(), "latest"],
            }))
            .send()
            .await
            .map_err(|e| RemoteError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let body: RpcResponse = response.json().await.map_err(|e| RemoteError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;
        let code = decode_code(body)?;
        let deployed = is_deployed(&code);
        tracing::debug!(address, deployed, "Fetched contract bytecode");
        Ok(deployed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn empty_code_is_not_a_contract() {
        assert!(!is_deployed("0x"));
        assert!(!is_deployed("0x0000"));
        assert!(!is_deployed(""));
        assert!(is_deployed("0x6080604052"));
    }

    #[test]
    fn rpc_errors_are_reported() {
        let body: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "invalid address" }
        }))
        .unwrap();
        assert_matches!(
            decode_code(body),
            Err(RemoteError::Rpc { message, .. }) if message.contains("invalid address")
        );
    }

    #[test]
    fn results_are_returned() {
        let body: RpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": "0x60" })).unwrap();
        assert_eq!(decode_code(body).unwrap(), "0x60");
    }
}
