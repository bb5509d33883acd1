// src/wallet/provider.rs
//! Wallet boundary over an EIP-1193 style provider.
//!
//! The provider is an opaque async capability: every call may wait on user
//! approval. Errors are classified from their RPC codes so callers can tell
//! an unavailable provider from a user rejection or an unsupported method.

use crate::error::WalletError;
use crate::models::credential::IdentityKey;
use crate::utils::serialization::to_hex_prefixed;
use futures::future::BoxFuture;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use thiserror::Error;

/// User rejected the request.
pub const CODE_USER_REJECTED: i64 = 4001;
/// The requested account or method is not authorized.
pub const CODE_UNAUTHORIZED: i64 = 4100;
/// The provider does not support the method.
pub const CODE_UNSUPPORTED: i64 = 4200;
/// The provider is disconnected from all chains.
pub const CODE_DISCONNECTED: i64 = 4900;
/// The provider is disconnected from the requested chain.
pub const CODE_CHAIN_DISCONNECTED: i64 = 4901;
/// JSON-RPC: method not found.
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC: invalid params.
pub const CODE_INVALID_PARAMS: i64 = -32602;

/// A provider request: method name plus positional params.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RequestArguments {
    pub method: String,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub params: JsonValue,
}

impl RequestArguments {
    pub fn new(method: impl Into<String>) -> Self {
        RequestArguments { method: method.into(), params: JsonValue::Null }
    }

    pub fn with_params(method: impl Into<String>, params: JsonValue) -> Self {
        RequestArguments { method: method.into(), params }
    }
}

/// Error object returned by the provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        ProviderRpcError { code, message: message.into() }
    }
}

impl From<ProviderRpcError> for WalletError {
    fn from(err: ProviderRpcError) -> Self {
        match err.code {
            CODE_USER_REJECTED => WalletError::UserRejected,
            CODE_METHOD_NOT_FOUND | CODE_INVALID_PARAMS | CODE_UNSUPPORTED => {
                WalletError::UnsupportedMethod(err.message)
            }
            CODE_UNAUTHORIZED | CODE_DISCONNECTED | CODE_CHAIN_DISCONNECTED => {
                WalletError::Unavailable(err.message)
            }
            code => WalletError::Rpc { code, message: err.message },
        }
    }
}

/// Minimal EIP-1193 provider.
pub trait Eip1193Provider: Send + Sync {
    fn request(&self, args: RequestArguments) -> BoxFuture<'_, Result<JsonValue, ProviderRpcError>>;
}

/// Ethereum wallet on top of a provider.
pub struct EthWalletProvider<P> {
    provider: P,
}

impl<P: Eip1193Provider> EthWalletProvider<P> {
    pub fn new(provider: P) -> Self {
        EthWalletProvider { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Asks the user to expose accounts (`eth_requestAccounts`).
    pub async fn connect(&self) -> Result<Vec<String>, WalletError> {
        let response = self.provider.request(RequestArguments::new("eth_requestAccounts")).await?;
        parse(response)
    }

    /// First exposed account (`eth_accounts`).
    pub async fn get_address(&self) -> Result<String, WalletError> {
        let response = self.provider.request(RequestArguments::new("eth_accounts")).await?;
        let accounts: Vec<String> = parse(response)?;
        accounts
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::Unavailable("no account exposed; connect the wallet first".into()))
    }

    /// The wallet address as a credential subject identity.
    pub async fn get_subject_id(&self) -> Result<IdentityKey, WalletError> {
        let address = self.get_address().await?;
        Ok(IdentityKey::eth_address(&address))
    }

    /// Signs `message` (UTF-8 text) with the first account.
    ///
    /// Tries `eth_sign` first; if the provider reports the method as
    /// unsupported, retries once with `personal_sign`. Any other error is
    /// returned as is.
    pub async fn sign(&self, message: &str) -> Result<String, WalletError> {
        let address = self.get_address().await?;
        let data = to_hex_prefixed(message.as_bytes());

        let primary = RequestArguments::with_params("eth_sign", json!([address, data]));
        let response = match self.provider.request(primary).await {
            Ok(response) => response,
            Err(err) => match WalletError::from(err) {
                WalletError::UnsupportedMethod(reason) => {
                    warn!("eth_sign unsupported ({}); falling back to personal_sign", reason);
                    let fallback = RequestArguments::with_params("personal_sign", json!([data, address]));
                    self.provider.request(fallback).await?
                }
                other => return Err(other),
            },
        };
        parse(response)
    }

    /// [`sign`](Self::sign) bounded by `timeout`.
    pub async fn sign_with_timeout(&self, message: &str, timeout: Duration) -> Result<String, WalletError> {
        tokio::time::timeout(timeout, self.sign(message))
            .await
            .map_err(|_| WalletError::Timeout)?
    }
}

fn parse<T: serde::de::DeserializeOwned>(response: JsonValue) -> Result<T, WalletError> {
    serde_json::from_value(response).map_err(|e| WalletError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::FutureExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records the methods it was asked for.
    #[derive(Default)]
    pub(crate) struct ScriptedProvider {
        responses: Mutex<VecDeque<Result<JsonValue, ProviderRpcError>>>,
        pub(crate) calls: Mutex<Vec<RequestArguments>>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(responses: Vec<Result<JsonValue, ProviderRpcError>>) -> Self {
            ScriptedProvider {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn methods(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|c| c.method.clone()).collect()
        }
    }

    impl Eip1193Provider for ScriptedProvider {
        fn request(&self, args: RequestArguments) -> BoxFuture<'_, Result<JsonValue, ProviderRpcError>> {
            self.calls.lock().unwrap().push(args);
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderRpcError::new(-32000, "script exhausted")));
            futures::future::ready(next).boxed()
        }
    }

    struct PendingProvider;

    impl Eip1193Provider for PendingProvider {
        fn request(&self, _args: RequestArguments) -> BoxFuture<'_, Result<JsonValue, ProviderRpcError>> {
            futures::future::pending().boxed()
        }
    }

    const ADDRESS: &str = "0x9ebd816fa99ce2101091203abd135fd08ce7c8ab";

    #[test]
    fn test_error_classification() {
        let classify = |code| WalletError::from(ProviderRpcError::new(code, "m"));
        assert_eq!(classify(4001), WalletError::UserRejected);
        assert_eq!(classify(-32601), WalletError::UnsupportedMethod("m".into()));
        assert_eq!(classify(-32602), WalletError::UnsupportedMethod("m".into()));
        assert_eq!(classify(4200), WalletError::UnsupportedMethod("m".into()));
        assert_eq!(classify(4900), WalletError::Unavailable("m".into()));
        assert_eq!(classify(-32000), WalletError::Rpc { code: -32000, message: "m".into() });
    }

    #[test]
    fn test_get_address_without_accounts_is_unavailable() {
        let wallet = EthWalletProvider::new(ScriptedProvider::new(vec![Ok(json!([]))]));
        let result = tokio_test::block_on(wallet.get_address());
        assert!(matches!(result, Err(WalletError::Unavailable(_))));
    }

    #[test]
    fn test_subject_id_is_lowercase_address() {
        let wallet = EthWalletProvider::new(ScriptedProvider::new(vec![Ok(json!([
            "0x9EBD816FA99CE2101091203ABD135FD08CE7C8AB"
        ]))]));
        let id = tokio_test::block_on(wallet.get_subject_id()).unwrap();
        assert_eq!(id, IdentityKey::eth_address(ADDRESS));
        assert_eq!(id.k, "9ebd816fa99ce2101091203abd135fd08ce7c8ab");
    }

    #[test]
    fn test_sign_falls_back_on_unsupported_method() {
        let provider = ScriptedProvider::new(vec![
            Ok(json!([ADDRESS])),
            Err(ProviderRpcError::new(-32601, "method not found")),
            Ok(json!("0xsigned")),
        ]);
        let wallet = EthWalletProvider::new(provider);
        let signature = tokio_test::block_on(wallet.sign("hi")).unwrap();
        assert_eq!(signature, "0xsigned");
        assert_eq!(wallet.provider().methods(), vec!["eth_accounts", "eth_sign", "personal_sign"]);

        let calls = wallet.provider().calls.lock().unwrap();
        assert_eq!(calls[1].params, json!([ADDRESS, "0x6869"]));
        assert_eq!(calls[2].params, json!(["0x6869", ADDRESS]));
    }

    #[test]
    fn test_sign_does_not_fall_back_on_rejection() {
        let provider = ScriptedProvider::new(vec![
            Ok(json!([ADDRESS])),
            Err(ProviderRpcError::new(4001, "user rejected")),
        ]);
        let wallet = EthWalletProvider::new(provider);
        assert_eq!(tokio_test::block_on(wallet.sign("hi")), Err(WalletError::UserRejected));
        assert_eq!(wallet.provider().methods(), vec!["eth_accounts", "eth_sign"]);
    }

    #[test]
    fn test_malformed_response() {
        let wallet = EthWalletProvider::new(ScriptedProvider::new(vec![Ok(json!({ "not": "a list" }))]));
        assert!(matches!(
            tokio_test::block_on(wallet.get_address()),
            Err(WalletError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_times_out() {
        let wallet = EthWalletProvider::new(PendingProvider);
        let result = wallet.sign_with_timeout("hi", Duration::from_millis(20)).await;
        assert_eq!(result, Err(WalletError::Timeout));
    }
}
