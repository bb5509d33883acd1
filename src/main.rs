// src/main.rs

//! # zkcred - Main Entry Point
//!
//! Loads configuration, sets up logging, builds the issuer, verifier and
//! proof backend, and starts the API server.
//!
//! ## Environment Variables
//! See [`zkcred::config`]. Without `ZKC_ISSUER_PRIVATE_KEY` a throwaway
//! issuer key is generated on every start; the same goes for the holder
//! wallet when `ZKC_ISSUANCE_URL` is set without `ZKC_SUBJECT_PRIVATE_KEY`.

use anyhow::Context;
use log::{info, warn};
use ethers::signers::LocalWallet;
use std::sync::Arc;
use std::time::Duration;
use zkcred::config::AppConfig;
use zkcred::services::api_server::ApiServer;
use zkcred::services::credential_issuer::CredentialIssuer;
use zkcred::services::issuance_client::IssuanceClient;
use zkcred::services::verifier::Verifier;
use zkcred::wallet::key_management::IssuerKey;
use zkcred::wallet::local_provider::LocalProvider;
use zkcred::wallet::provider::EthWalletProvider;
use zkcred::zkp::backend::TransparentBackend;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load configuration and initialise logging
/// 2. Load or generate the issuer key
/// 3. Initialize service components, plus remote issuance if configured
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str())).init();

    let issuer_key = match config.issuer_key().context("ZKC_ISSUER_PRIVATE_KEY is not a valid secp256k1 secret")? {
        Some(key) => key,
        None => {
            warn!("no issuer key configured, generating a throwaway key");
            IssuerKey::random()
        }
    };
    info!("issuer public key {}", issuer_key.public_key().to_hex());

    let credential_issuer = CredentialIssuer::new(issuer_key, config.proof_type, config.credential_validity_days);
    let verifier = Verifier::new();

    // Development prover: checks the statement natively, reveals the input.
    warn!("using the transparent proof backend; proofs are not zero-knowledge");
    let backend = Arc::new(TransparentBackend::new(config.proof_type));

    let mut api_server = ApiServer::new(credential_issuer, verifier, backend);
    if let Some(url) = &config.issuance_url {
        let client = IssuanceClient::with_timeout(url.as_str(), Duration::from_secs(30))
            .context("failed to build the issuance client")?;
        let provider = match config.subject_wallet().context("ZKC_SUBJECT_PRIVATE_KEY is not a valid wallet key")? {
            Some(provider) => provider,
            None => {
                warn!("no subject wallet key configured, generating a throwaway wallet");
                LocalProvider::new(LocalWallet::new(&mut rand::thread_rng()))
            }
        };
        info!("remote issuance service at {}", url);
        api_server = api_server.with_remote_issuance(client, EthWalletProvider::new(provider));
    }
    api_server
        .run(config.listen_addr)
        .await
        .with_context(|| format!("API server on {} failed", config.listen_addr))
}
