// src/services/issuance_client.rs
//! HTTP client for a remote passport issuance service.
//!
//! The holder proves control of a subject identity (a wallet signature over
//! a challenge) and receives an already signed credential back.

use crate::error::IssuanceError;
use crate::models::credential::{IdentityKey, IssuedCredential};
use crate::wallet::provider::{Eip1193Provider, EthWalletProvider};
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ISSUE_PATH: &str = "/zkc/passport/issue";

/// Body of an issuance request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub subject_id: IdentityKey,
    /// Text the subject signed.
    pub challenge: String,
    /// Wallet signature over `challenge`.
    pub signature: String,
}

#[derive(Debug, Clone)]
pub struct IssuanceClient {
    client: Client,
    base_url: String,
}

impl IssuanceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Client whose requests fail after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IssuanceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        IssuanceClient { client, base_url }
    }

    /// Posts `request` and decodes the issued credential.
    ///
    /// # Errors
    /// - `IssuanceError::Rejected` for any non-2xx status, with the body
    /// - `IssuanceError::Transport` for connection or decoding failures
    pub async fn issue(&self, request: &IssueRequest) -> Result<IssuedCredential, IssuanceError> {
        let url = format!("{}{}", self.base_url, ISSUE_PATH);
        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("could not read issuance error body ({}): {}", status, e);
                    String::new()
                }
            };
            return Err(IssuanceError::Rejected { status: status.as_u16(), body });
        }

        let issued: IssuedCredential = response.json().await?;
        info!("received credential from {} for {}", self.base_url, request.subject_id.k);
        Ok(issued)
    }

    /// Signs `challenge` with the wallet and requests a credential for it.
    pub async fn issue_with_wallet<P: Eip1193Provider>(
        &self,
        wallet: &EthWalletProvider<P>,
        challenge: &str,
    ) -> Result<IssuedCredential, IssuanceError> {
        let subject_id = wallet.get_subject_id().await?;
        let signature = wallet.sign(challenge).await?;
        self.issue(&IssueRequest {
            subject_id,
            challenge: challenge.to_string(),
            signature,
        })
        .await
    }
}
