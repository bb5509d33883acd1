// src/wallet/local_provider.rs
//! In-process EIP-1193 provider backed by an `ethers` local wallet.
//!
//! Signs issuance challenges for the API server's remote issuance route and
//! stands in for a browser wallet in tests. Signatures are EIP-191
//! personal-message signatures.

use crate::transform::encoder::decode_hex;
use crate::utils::serialization::to_hex_prefixed;
use crate::wallet::provider::{
    Eip1193Provider, ProviderRpcError, RequestArguments, CODE_INVALID_PARAMS, CODE_METHOD_NOT_FOUND,
    CODE_UNAUTHORIZED, CODE_USER_REJECTED,
};
use ethers::signers::{LocalWallet, Signer};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct LocalProvider {
    wallet: LocalWallet,
    connected: AtomicBool,
    eth_sign_enabled: bool,
    reject_signing: bool,
}

impl LocalProvider {
    /// A provider that exposes no accounts until `eth_requestAccounts`.
    pub fn new(wallet: LocalWallet) -> Self {
        LocalProvider {
            wallet,
            connected: AtomicBool::new(false),
            eth_sign_enabled: true,
            reject_signing: false,
        }
    }

    pub fn from_hex(secret: &str) -> Result<Self, ProviderRpcError> {
        let wallet: LocalWallet = secret
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| ProviderRpcError::new(CODE_INVALID_PARAMS, format!("invalid wallet key: {}", e)))?;
        Ok(Self::new(wallet))
    }

    /// Answer `eth_sign` with "method not found", like many modern wallets.
    pub fn without_eth_sign(mut self) -> Self {
        self.eth_sign_enabled = false;
        self
    }

    /// Reject every signing request as if the user declined.
    pub fn rejecting(mut self) -> Self {
        self.reject_signing = true;
        self
    }

    pub fn address(&self) -> String {
        format!("{:?}", self.wallet.address())
    }

    fn accounts(&self) -> JsonValue {
        if self.connected.load(Ordering::SeqCst) {
            json!([self.address()])
        } else {
            json!([])
        }
    }

    /// Picks the message out of `params`, checking the account.
    fn message_param(&self, params: &JsonValue, data_index: usize) -> Result<Vec<u8>, ProviderRpcError> {
        let invalid = || ProviderRpcError::new(CODE_INVALID_PARAMS, "expected [address, data] params");
        let params = params.as_array().filter(|p| p.len() == 2).ok_or_else(invalid)?;
        let data = params[data_index].as_str().ok_or_else(invalid)?;
        let account = params[1 - data_index].as_str().ok_or_else(invalid)?;

        if !account.eq_ignore_ascii_case(&self.address()) {
            return Err(ProviderRpcError::new(CODE_UNAUTHORIZED, format!("unknown account {}", account)));
        }
        decode_hex(data).map_err(|e| ProviderRpcError::new(CODE_INVALID_PARAMS, e.to_string()))
    }

    async fn sign(&self, params: &JsonValue, data_index: usize) -> Result<JsonValue, ProviderRpcError> {
        let message = self.message_param(params, data_index)?;
        if self.reject_signing {
            return Err(ProviderRpcError::new(CODE_USER_REJECTED, "user rejected the request"));
        }
        let signature = self
            .wallet
            .sign_message(message)
            .await
            .map_err(|e| ProviderRpcError::new(-32603, e.to_string()))?;
        Ok(JsonValue::String(to_hex_prefixed(&signature.to_vec())))
    }

    async fn handle(&self, args: RequestArguments) -> Result<JsonValue, ProviderRpcError> {
        match args.method.as_str() {
            "eth_requestAccounts" => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(self.accounts())
            }
            "eth_accounts" => Ok(self.accounts()),
            "eth_sign" if self.eth_sign_enabled => self.sign(&args.params, 1).await,
            "personal_sign" => self.sign(&args.params, 0).await,
            method => Err(ProviderRpcError::new(
                CODE_METHOD_NOT_FOUND,
                format!("method {} not found", method),
            )),
        }
    }
}

impl Eip1193Provider for LocalProvider {
    fn request(&self, args: RequestArguments) -> BoxFuture<'_, Result<JsonValue, ProviderRpcError>> {
        self.handle(args).boxed()
    }
}
