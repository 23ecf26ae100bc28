//! Minimal HTTP client shared by the chain state provider and the
//! broadcaster: Ethereum JSON-RPC calls and Cosmos REST requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{json, Value};

/// Transport-level failures.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The request could not be sent or the body could not be read.
    #[error("{method}: request failed: {reason}")]
    Transport {
        /// JSON-RPC method or REST path.
        method: String,
        /// Client diagnostic.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("{method}: HTTP {status}: {body}")]
    Status {
        /// JSON-RPC method or REST path.
        method: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The node returned a JSON-RPC error object.
    #[error("{method}: error {code}: {message}")]
    Node {
        /// JSON-RPC method.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The response is not the expected shape.
    #[error("{method}: unexpected response: {reason}")]
    Decode {
        /// JSON-RPC method or REST path.
        method: String,
        /// What was wrong.
        reason: String,
    },
}

impl RpcError {
    pub(crate) fn decode(method: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// A REST response whose status is reported rather than turned into an error.
#[derive(Debug, Clone)]
pub struct RestResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body, or `Value::Null` for an empty or non-JSON body.
    pub body: Value,
}

impl RestResponse {
    /// Returns `true` for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// HTTP client with a request timeout and monotonically increasing
/// JSON-RPC ids.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpClient {
    /// Builds a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport {
                method: "client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Calls `method` on the JSON-RPC endpoint `url` and returns its `result`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Node`] for a JSON-RPC error object and the other
    /// variants for transport failures.
    pub async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        tracing::trace!(target: "sigil::rpc", method, id, "json-rpc request");
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport(method, &e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| transport(method, &e))?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                RpcError::decode(method, format!("invalid JSON: {e}"))
            } else {
                RpcError::Status {
                    method: method.to_string(),
                    status: status.as_u16(),
                    body: text.clone(),
                }
            }
        })?;

        if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::Node {
                method: method.to_string(),
                code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        if !status.is_success() {
            return Err(RpcError::Status {
                method: method.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        value
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::decode(method, "missing result field"))
    }

    /// `GET base/path`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the request fails before a
    /// response arrives.
    pub async fn rest_get(&self, base: &str, path: &str) -> Result<RestResponse, RpcError> {
        let url = join_url(base, path);
        tracing::trace!(target: "sigil::rpc", %url, "rest GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport(path, &e))?;
        read_rest(path, response).await
    }

    /// `POST base/path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] if the request fails before a
    /// response arrives.
    pub async fn rest_post(
        &self,
        base: &str,
        path: &str,
        body: &Value,
    ) -> Result<RestResponse, RpcError> {
        let url = join_url(base, path);
        tracing::trace!(target: "sigil::rpc", %url, "rest POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport(path, &e))?;
        read_rest(path, response).await
    }
}

async fn read_rest(path: &str, response: reqwest::Response) -> Result<RestResponse, RpcError> {
    let status = response.status().as_u16();
    let text = response.text().await.map_err(|e| transport(path, &e))?;
    let body = serde_json::from_str(&text).unwrap_or(Value::Null);
    Ok(RestResponse { status, body })
}

fn transport(method: &str, err: &reqwest::Error) -> RpcError {
    RpcError::Transport {
        method: method.to_string(),
        reason: err.to_string(),
    }
}

/// Joins a base URL and a path with exactly one slash between them.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Parses a `0x`-prefixed quantity.
///
/// # Errors
///
/// Returns [`RpcError::Decode`] if `value` is not a hex string fitting in
/// 128 bits.
pub fn parse_quantity(method: &str, value: &Value) -> Result<u128, RpcError> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::decode(method, format!("expected hex string, got {value}")))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::decode(method, format!("missing 0x prefix: {text}")))?;
    if digits.is_empty() {
        return Err(RpcError::decode(method, "empty quantity"));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| RpcError::decode(method, format!("invalid quantity {text}: {e}")))
}

/// Renders a quantity the way JSON-RPC expects it.
#[must_use]
pub fn quantity<T: std::fmt::LowerHex>(value: T) -> String {
    format!("{value:#x}")
}
