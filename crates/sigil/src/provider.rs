//! Read access to chain state: Cosmos accounts, EVM nonces, gas estimates and
//! fee market data.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sigil_core::error::ResolveError;
use sigil_core::types::{AccountState, ChainDescriptor, EvmTransaction, FeeData};

use crate::rpc::{parse_quantity, quantity, HttpClient, RpcError};

/// Path of the Cosmos auth account query.
pub const ACCOUNT_PATH: &str = "/cosmos/auth/v1beta1/accounts";

/// Chain state the resolver reads.
#[async_trait]
pub trait ChainStateProvider: Send + Sync {
    /// Cosmos account state for a bech32 address.
    ///
    /// Returns `Ok(None)` if the account does not exist on chain yet.
    async fn account(
        &self,
        chain: &ChainDescriptor,
        address: &str,
    ) -> Result<Option<AccountState>, ResolveError>;

    /// Pending nonce of a `0x` hex address.
    async fn nonce(&self, chain: &ChainDescriptor, address: &str) -> Result<u64, ResolveError>;

    /// Gas estimate for `tx` sent from `from`.
    async fn estimate_gas(
        &self,
        chain: &ChainDescriptor,
        from: &str,
        tx: &EvmTransaction,
    ) -> Result<u64, ResolveError>;

    /// Current fee market data.
    async fn fee_data(&self, chain: &ChainDescriptor) -> Result<FeeData, ResolveError>;
}

/// [`ChainStateProvider`] over the chain's REST and JSON-RPC endpoints.
#[derive(Debug)]
pub struct HttpChainStateProvider {
    http: HttpClient,
}

impl HttpChainStateProvider {
    /// Creates a provider whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Provider`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        let http = HttpClient::new(timeout).map_err(provider_error)?;
        Ok(Self { http })
    }

    async fn evm_call(
        &self,
        chain: &ChainDescriptor,
        method: &str,
        params: Value,
    ) -> Result<Value, ResolveError> {
        let url = chain.evm_rpc_endpoint.as_deref().ok_or_else(|| {
            ResolveError::provider(format!("{} has no EVM RPC endpoint", chain.chain_id))
        })?;
        self.http
            .call(url, method, params)
            .await
            .map_err(provider_error)
    }
}

#[async_trait]
impl ChainStateProvider for HttpChainStateProvider {
    async fn account(
        &self,
        chain: &ChainDescriptor,
        address: &str,
    ) -> Result<Option<AccountState>, ResolveError> {
        let base = chain.rest_endpoint.as_deref().ok_or_else(|| {
            ResolveError::provider(format!("{} has no REST endpoint", chain.chain_id))
        })?;
        let path = format!("{ACCOUNT_PATH}/{address}");
        let response = self
            .http
            .rest_get(base, &path)
            .await
            .map_err(provider_error)?;

        if response.status == 404 || (!response.is_success() && mentions_not_found(&response.body))
        {
            tracing::debug!(target: "sigil::provider", chain_id = %chain.chain_id, address, "account not found");
            return Ok(None);
        }
        if !response.is_success() {
            return Err(ResolveError::provider(format!(
                "{path}: HTTP {}: {}",
                response.status, response.body
            )));
        }

        parse_account_response(&response.body)
            .map(Some)
            .map_err(provider_error)
    }

    async fn nonce(&self, chain: &ChainDescriptor, address: &str) -> Result<u64, ResolveError> {
        const METHOD: &str = "eth_getTransactionCount";
        let result = self
            .evm_call(chain, METHOD, json!([address, "pending"]))
            .await?;
        to_u64(METHOD, parse_quantity(METHOD, &result).map_err(provider_error)?)
    }

    async fn estimate_gas(
        &self,
        chain: &ChainDescriptor,
        from: &str,
        tx: &EvmTransaction,
    ) -> Result<u64, ResolveError> {
        const METHOD: &str = "eth_estimateGas";
        let result = self
            .evm_call(chain, METHOD, json!([estimate_request(from, tx)]))
            .await?;
        to_u64(METHOD, parse_quantity(METHOD, &result).map_err(provider_error)?)
    }

    async fn fee_data(&self, chain: &ChainDescriptor) -> Result<FeeData, ResolveError> {
        let gas_price = self.evm_call(chain, "eth_gasPrice", json!([])).await?;
        let gas_price = parse_quantity("eth_gasPrice", &gas_price).map_err(provider_error)?;

        // Nodes without EIP-1559 support do not implement this method.
        let priority = match self
            .evm_call(chain, "eth_maxPriorityFeePerGas", json!([]))
            .await
        {
            Ok(value) => Some(
                parse_quantity("eth_maxPriorityFeePerGas", &value).map_err(provider_error)?,
            ),
            Err(err) => {
                tracing::debug!(target: "sigil::provider", error = %err, "no priority fee suggestion");
                None
            }
        };

        let block = self
            .evm_call(chain, "eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        let base_fee = match block.get("baseFeePerGas") {
            Some(value) if !value.is_null() => Some(
                parse_quantity("eth_getBlockByNumber", value).map_err(provider_error)?,
            ),
            _ => None,
        };

        Ok(fee_data_from(gas_price, base_fee, priority))
    }
}

/// Combines raw fee market readings.
///
/// With a base fee, the fee cap is `2 * base_fee + priority` and the priority
/// fee defaults to zero. Without one the chain is treated as legacy-only.
#[must_use]
pub fn fee_data_from(gas_price: u128, base_fee: Option<u128>, priority: Option<u128>) -> FeeData {
    match base_fee {
        Some(base_fee) => {
            let priority = priority.unwrap_or_default();
            FeeData {
                gas_price: Some(gas_price),
                max_fee_per_gas: Some(base_fee.saturating_mul(2).saturating_add(priority)),
                max_priority_fee_per_gas: Some(priority),
            }
        }
        None => FeeData {
            gas_price: Some(gas_price),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        },
    }
}

/// The `eth_estimateGas` call object for `tx`.
#[must_use]
pub fn estimate_request(from: &str, tx: &EvmTransaction) -> Value {
    let mut request = json!({
        "from": from,
        "value": quantity(tx.value),
        "data": tx.data.to_string(),
    });
    if let Some(to) = tx.to {
        request["to"] = json!(to.to_string());
    }
    request
}

/// Extracts account number and sequence from an auth account query.
///
/// Handles plain base accounts, accounts nesting a `base_account` (such as
/// ethermint `EthAccount`) and vesting accounts. Absent fields read as zero,
/// as the node omits them for fresh accounts.
///
/// # Errors
///
/// Returns [`RpcError::Decode`] if no account object is present or a field
/// is not a number.
pub fn parse_account_response(body: &Value) -> Result<AccountState, RpcError> {
    const CONTEXT: &str = ACCOUNT_PATH;
    let account = body
        .get("account")
        .ok_or_else(|| RpcError::decode(CONTEXT, "missing account"))?;

    let base = account
        .get("base_account")
        .or_else(|| {
            account
                .get("base_vesting_account")
                .and_then(|v| v.get("base_account"))
        })
        .unwrap_or(account);

    Ok(AccountState {
        account_number: number_field(base, "account_number")?,
        sequence: number_field(base, "sequence")?,
    })
}

fn number_field(object: &Value, field: &str) -> Result<u64, RpcError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::String(text)) => text
            .parse()
            .map_err(|e| RpcError::decode(ACCOUNT_PATH, format!("{field}: {e}"))),
        Some(Value::Number(number)) => number
            .as_u64()
            .ok_or_else(|| RpcError::decode(ACCOUNT_PATH, format!("{field}: {number}"))),
        Some(other) => Err(RpcError::decode(
            ACCOUNT_PATH,
            format!("{field}: unexpected {other}"),
        )),
    }
}

fn mentions_not_found(body: &Value) -> bool {
    body.get("message")
        .and_then(Value::as_str)
        .is_some_and(|m| m.contains("not found"))
}

fn to_u64(method: &str, value: u128) -> Result<u64, ResolveError> {
    u64::try_from(value)
        .map_err(|_| ResolveError::provider(format!("{method}: {value} overflows u64")))
}

#[allow(clippy::needless_pass_by_value)]
fn provider_error(err: RpcError) -> ResolveError {
    ResolveError::provider(err.to_string())
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
    use alloy_primitives::{Address, Bytes, U256};
    use sigil_core::types::{Currency, EvmTxKind};

    #[test]
    fn test_parse_base_account() {
        let body = json!({
            "account": {
                "@type": "/cosmos.auth.v1beta1.BaseAccount",
                "address": "osmo1w508d6qejxtdg4y5r3zarvary0c5xw7kjxy2e2",
                "account_number": "12345",
                "sequence": "7"
            }
        });
        assert_eq!(
            parse_account_response(&body).unwrap(),
            AccountState {
                account_number: 12345,
                sequence: 7
            }
        );
    }

    #[test]
    fn test_parse_eth_account() {
        let body = json!({
            "account": {
                "@type": "/ethermint.types.v1.EthAccount",
                "base_account": { "account_number": 9, "sequence": "3" },
                "code_hash": "0xc5d2"
            }
        });
        let state = parse_account_response(&body).unwrap();
        assert_eq!(state.account_number, 9);
        assert_eq!(state.sequence, 3);
    }

    #[test]
    fn test_parse_vesting_account() {
        let body = json!({
            "account": {
                "base_vesting_account": {
                    "base_account": { "account_number": "4", "sequence": "0" }
                }
            }
        });
        assert_eq!(parse_account_response(&body).unwrap().account_number, 4);
    }

    #[test]
    fn test_parse_fresh_account_defaults_to_zero() {
        let body = json!({ "account": { "address": "osmo1..." } });
        assert_eq!(parse_account_response(&body).unwrap(), AccountState::default());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_account_response(&json!({})).is_err());
        assert!(parse_account_response(&json!({"account": {"sequence": "x"}})).is_err());
        assert!(parse_account_response(&json!({"account": {"sequence": true}})).is_err());
    }

    #[test]
    fn test_not_found_detection() {
        assert!(mentions_not_found(
            &json!({"code": 5, "message": "account osmo1abc not found"})
        ));
        assert!(!mentions_not_found(&json!({"code": 13, "message": "internal"})));
    }

    #[test]
    fn test_fee_data_with_base_fee() {
        let fees = fee_data_from(30, Some(10), Some(2));
        assert_eq!(fees.gas_price, Some(30));
        assert_eq!(fees.max_fee_per_gas, Some(22));
        assert_eq!(fees.max_priority_fee_per_gas, Some(2));

        let fees = fee_data_from(30, Some(10), None);
        assert_eq!(fees.max_fee_per_gas, Some(20));
        assert_eq!(fees.max_priority_fee_per_gas, Some(0));
    }

    #[test]
    fn test_fee_data_legacy_chain() {
        let fees = fee_data_from(30, None, Some(2));
        assert_eq!(fees.gas_price, Some(30));
        assert!(fees.max_fee_per_gas.is_none());
    }

    #[test]
    fn test_estimate_request() {
        let tx = EvmTransaction {
            kind: EvmTxKind::Eip1559,
            to: Some(Address::repeat_byte(0x11)),
            value: U256::from(1_000_u64),
            data: Bytes::from(vec![0xab, 0xcd]),
            gas_limit: 0,
            nonce: 0,
            chain_numeric_id: 9001,
            access_list: None,
            max_priority_fee_per_gas: None,
            max_fee_per_gas: None,
            gas_price: None,
        };
        let request = estimate_request("0xabc", &tx);
        assert_eq!(request["from"], "0xabc");
        assert_eq!(request["value"], "0x3e8");
        assert_eq!(request["data"], "0xabcd");
        assert_eq!(
            request["to"].as_str().unwrap().to_lowercase(),
            "0x1111111111111111111111111111111111111111"
        );

        let creation = EvmTransaction { to: None, ..tx };
        assert!(estimate_request("0xabc", &creation).get("to").is_none());
    }

    #[tokio::test]
    async fn test_missing_endpoints_are_provider_errors() {
        let provider = HttpChainStateProvider::new(Duration::from_secs(1)).unwrap();
        let chain = ChainDescriptor::cosmos("local-1", "osmo", Currency::new("OSMO", "uosmo", 6));

        let err = provider
            .account(&chain, "osmo1w508d6qejxtdg4y5r3zarvary0c5xw7kjxy2e2")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Provider { .. }));

        let err = provider.fee_data(&chain).await.unwrap_err();
        assert!(err.to_string().contains("no EVM RPC endpoint"));
    }
}
