// src/config.rs
//! Runtime configuration.
//!
//! Values come from built-in defaults, overridden by `ZKC_*` environment
//! variables (a `.env` file is loaded first if present):
//!
//! - `ZKC_LISTEN_ADDR`: API bind address (default `127.0.0.1:3000`)
//! - `ZKC_ISSUER_PRIVATE_KEY`: hex secp256k1 secret of the local issuer
//! - `ZKC_ISSUANCE_URL`: base URL of a remote issuance service, enables
//!   `POST /request-credential`
//! - `ZKC_SUBJECT_PRIVATE_KEY`: hex secret of the holder wallet that signs
//!   issuance challenges
//! - `ZKC_PROOF_TYPE`: `Sha256Secp256k1` or `Keccak256Secp256k1`
//! - `ZKC_LOG_LEVEL`: default `env_logger` filter (default `info`)
//! - `ZKC_CREDENTIAL_VALIDITY_DAYS`: `0` issues credentials that never expire

use crate::error::SigningError;
use crate::utils::crypto::ProofType;
use crate::wallet::key_management::IssuerKey;
use crate::wallet::local_provider::LocalProvider;
use crate::wallet::provider::ProviderRpcError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub issuer_private_key: Option<String>,
    pub issuance_url: Option<String>,
    pub subject_private_key: Option<String>,
    pub proof_type: ProofType,
    pub log_level: String,
    pub credential_validity_days: u32,
}

impl AppConfig {
    /// Loads `.env`, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::load_with(Config::builder().add_source(Environment::with_prefix("ZKC")))
    }

    /// Applies the defaults beneath `builder`'s sources and deserializes.
    pub fn load_with(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .set_default("listen_addr", "127.0.0.1:3000")?
            .set_default("proof_type", ProofType::default().as_str())?
            .set_default("log_level", "info")?
            .set_default("credential_validity_days", 0)?
            .build()?
            .try_deserialize()
    }

    /// The holder wallet for remote issuance, if a key is configured.
    pub fn subject_wallet(&self) -> Result<Option<LocalProvider>, ProviderRpcError> {
        self.subject_private_key.as_deref().map(LocalProvider::from_hex).transpose()
    }

    /// The configured issuer key, if any.
    pub fn issuer_key(&self) -> Result<Option<IssuerKey>, SigningError> {
        self.issuer_private_key.as_deref().map(IssuerKey::from_hex).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::key_management::tests::{FIXTURE_PUBLIC, FIXTURE_SECRET};
    use crate::wallet::local_provider::tests::SUBJECT_SECRET;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_with(Config::builder()).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.proof_type, ProofType::Sha256Secp256k1);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.credential_validity_days, 0);
        assert!(config.issuer_private_key.is_none());
        assert!(config.issuance_url.is_none());
        assert!(config.subject_wallet().unwrap().is_none());
        assert!(config.issuer_key().unwrap().is_none());
    }

    #[test]
    fn test_overrides() {
        let builder = Config::builder()
            .set_override("listen_addr", "0.0.0.0:8080")
            .unwrap()
            .set_override("proof_type", "Keccak256Secp256k1")
            .unwrap()
            .set_override("credential_validity_days", 365)
            .unwrap()
            .set_override("issuer_private_key", FIXTURE_SECRET)
            .unwrap()
            .set_override("issuance_url", "https://issuer.example")
            .unwrap()
            .set_override("subject_private_key", SUBJECT_SECRET)
            .unwrap();
        let config = AppConfig::load_with(builder).unwrap();

        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.proof_type, ProofType::Keccak256Secp256k1);
        assert_eq!(config.credential_validity_days, 365);
        let key = config.issuer_key().unwrap().unwrap();
        assert_eq!(key.public_key().to_hex(), FIXTURE_PUBLIC);
        assert_eq!(config.issuance_url.as_deref(), Some("https://issuer.example"));
        assert!(config.subject_wallet().unwrap().is_some());
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let bad_addr = Config::builder().set_override("listen_addr", "nowhere").unwrap();
        assert!(AppConfig::load_with(bad_addr).is_err());

        let bad_key = Config::builder().set_override("issuer_private_key", "00").unwrap();
        let config = AppConfig::load_with(bad_key).unwrap();
        assert_eq!(config.issuer_key().unwrap_err(), SigningError::InvalidSecretKey);

        let bad_wallet = Config::builder().set_override("subject_private_key", "zz").unwrap();
        let config = AppConfig::load_with(bad_wallet).unwrap();
        assert!(config.subject_wallet().is_err());
    }
}
