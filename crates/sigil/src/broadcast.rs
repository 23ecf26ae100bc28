//! Hands signed envelopes to the network.
//!
//! Broadcasting is a single best-effort attempt; the result is surfaced and
//! never retried here.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use sigil_chain::{cosmos, evm};
use sigil_core::error::BroadcastError;
use sigil_core::types::{BroadcastMode, ChainDescriptor};

use crate::rpc::{HttpClient, RpcError};

/// Path of the Cosmos tx service broadcast endpoint.
pub const BROADCAST_PATH: &str = "/cosmos/tx/v1beta1/txs";

/// A fully signed transaction ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedEnvelope {
    /// Encoded Cosmos `TxRaw`.
    CosmosTxRaw(Vec<u8>),
    /// Signed EVM envelope (typed transactions include the type byte).
    EvmRaw(Vec<u8>),
}

impl SignedEnvelope {
    /// Raw bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::CosmosTxRaw(bytes) | Self::EvmRaw(bytes) => bytes,
        }
    }

    /// Transaction hash as the chain reports it: uppercase hex of
    /// `SHA256(TxRaw)` for Cosmos, `0x`-prefixed Keccak-256 for EVM.
    #[must_use]
    pub fn local_hash(&self) -> String {
        match self {
            Self::CosmosTxRaw(bytes) => cosmos::tx_hash(bytes),
            Self::EvmRaw(bytes) => evm::tx_hash(bytes).to_string(),
        }
    }
}

/// Submits signed transactions.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Broadcasts `envelope` and returns the transaction hash.
    async fn broadcast(
        &self,
        chain: &ChainDescriptor,
        envelope: &SignedEnvelope,
        mode: BroadcastMode,
    ) -> Result<String, BroadcastError>;
}

/// [`Broadcaster`] over the chain's REST and JSON-RPC endpoints.
#[derive(Debug)]
pub struct HttpBroadcaster {
    http: HttpClient,
}

impl HttpBroadcaster {
    /// Creates a broadcaster whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Failure`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, BroadcastError> {
        let http = HttpClient::new(timeout).map_err(|e| BroadcastError::failure(e.to_string()))?;
        Ok(Self { http })
    }

    async fn broadcast_cosmos(
        &self,
        chain: &ChainDescriptor,
        tx_raw: &[u8],
        mode: BroadcastMode,
    ) -> Result<String, BroadcastError> {
        let base = chain.rest_endpoint.as_deref().ok_or_else(|| {
            BroadcastError::failure(format!("{} has no REST endpoint", chain.chain_id))
        })?;
        let response = self
            .http
            .rest_post(base, BROADCAST_PATH, &cosmos_broadcast_body(tx_raw, mode))
            .await
            .map_err(|e| BroadcastError::failure(e.to_string()))?;

        if !response.is_success() {
            return Err(BroadcastError::failure(format!(
                "{BROADCAST_PATH}: HTTP {}: {}",
                response.status, response.body
            )));
        }
        parse_cosmos_broadcast_response(&response.body)
    }

    async fn broadcast_evm(
        &self,
        chain: &ChainDescriptor,
        envelope: &[u8],
    ) -> Result<String, BroadcastError> {
        const METHOD: &str = "eth_sendRawTransaction";
        let url = chain.evm_rpc_endpoint.as_deref().ok_or_else(|| {
            BroadcastError::failure(format!("{} has no EVM RPC endpoint", chain.chain_id))
        })?;
        let params = json!([format!("0x{}", hex::encode(envelope))]);

        match self.http.call(url, METHOD, params).await {
            Ok(Value::String(hash)) => Ok(hash),
            Ok(other) => Err(BroadcastError::failure(format!(
                "{METHOD}: unexpected result {other}"
            ))),
            Err(RpcError::Node { code, message, .. }) => Err(BroadcastError::Rejected {
                code,
                log: message,
            }),
            Err(err) => Err(BroadcastError::failure(err.to_string())),
        }
    }
}

#[async_trait]
impl Broadcaster for HttpBroadcaster {
    async fn broadcast(
        &self,
        chain: &ChainDescriptor,
        envelope: &SignedEnvelope,
        mode: BroadcastMode,
    ) -> Result<String, BroadcastError> {
        tracing::info!(
            target: "sigil::broadcast",
            chain_id = %chain.chain_id,
            %mode,
            local_hash = %envelope.local_hash(),
            "broadcasting transaction"
        );
        match envelope {
            SignedEnvelope::CosmosTxRaw(bytes) => self.broadcast_cosmos(chain, bytes, mode).await,
            SignedEnvelope::EvmRaw(bytes) => self.broadcast_evm(chain, bytes).await,
        }
    }
}

/// Request body for the Cosmos broadcast endpoint.
#[must_use]
pub fn cosmos_broadcast_body(tx_raw: &[u8], mode: BroadcastMode) -> Value {
    json!({
        "tx_bytes": BASE64.encode(tx_raw),
        "mode": mode.cosmos_mode(),
    })
}

/// Reads the transaction hash out of a Cosmos broadcast response.
///
/// # Errors
///
/// - [`BroadcastError::Rejected`] if `tx_response.code` is non-zero
/// - [`BroadcastError::Failure`] if the response has no `tx_response.txhash`
pub fn parse_cosmos_broadcast_response(body: &Value) -> Result<String, BroadcastError> {
    let tx_response = body
        .get("tx_response")
        .ok_or_else(|| BroadcastError::failure(format!("missing tx_response in {body}")))?;

    let code = tx_response
        .get("code")
        .and_then(Value::as_i64)
        .unwrap_or_default();
    if code != 0 {
        return Err(BroadcastError::Rejected {
            code,
            log: tx_response
                .get("raw_log")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    tx_response
        .get("txhash")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BroadcastError::failure("missing txhash"))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::indexing_slicing
    )]

    use super::*;
    use sigil_core::types::Currency;

    #[test]
    fn test_cosmos_body() {
        let body = cosmos_broadcast_body(&[0x0a, 0x01, 0xff], BroadcastMode::Block);
        assert_eq!(body["tx_bytes"], "CgH/");
        assert_eq!(body["mode"], "BROADCAST_MODE_BLOCK");
    }

    #[test]
    fn test_parse_success() {
        let body = json!({
            "tx_response": { "code": 0, "txhash": "ABCDEF", "raw_log": "[]" }
        });
        assert_eq!(parse_cosmos_broadcast_response(&body).unwrap(), "ABCDEF");
    }

    #[test]
    fn test_parse_rejected() {
        let body = json!({
            "tx_response": {
                "code": 32,
                "txhash": "ABCDEF",
                "raw_log": "account sequence mismatch, expected 6, got 5"
            }
        });
        match parse_cosmos_broadcast_response(&body).unwrap_err() {
            BroadcastError::Rejected { code, log } => {
                assert_eq!(code, 32);
                assert!(log.contains("sequence mismatch"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_cosmos_broadcast_response(&json!({"code": 3})),
            Err(BroadcastError::Failure { .. })
        ));
        assert!(matches!(
            parse_cosmos_broadcast_response(&json!({"tx_response": {"code": 0}})),
            Err(BroadcastError::Failure { .. })
        ));
    }

    #[test]
    fn test_local_hash() {
        let cosmos = SignedEnvelope::CosmosTxRaw(vec![]);
        assert_eq!(
            cosmos.local_hash(),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
        let evm = SignedEnvelope::EvmRaw(vec![]);
        assert_eq!(
            evm.local_hash(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert!(evm.bytes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails() {
        let broadcaster = HttpBroadcaster::new(Duration::from_secs(1)).unwrap();
        let chain = ChainDescriptor::cosmos("local-1", "osmo", Currency::new("OSMO", "uosmo", 6));
        let err = broadcaster
            .broadcast(&chain, &SignedEnvelope::EvmRaw(vec![0x02]), BroadcastMode::Sync)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no EVM RPC endpoint"));
    }
}
