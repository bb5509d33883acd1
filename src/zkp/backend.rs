// src/zkp/backend.rs
//! # Prover boundary
//!
//! The pipeline hands a finished [`ZkInput`] to a [`ProofBackend`] and
//! consumes the opaque proof blob it returns exactly once. Proving is
//! CPU-bound and may take seconds, so the async helpers run the backend on
//! Tokio's blocking pool; cancellation is the caller's business.
//!
//! ## Backends
//! - [`TransparentBackend`]: development backend. Its "proof" is the
//!   serialised input and it checks the statement natively. It proves
//!   nothing in zero knowledge and must not be used where the credential
//!   is meant to stay private.

use crate::error::ProverError;
use crate::models::credential::ID_SECP256K1_KEY;
use crate::utils::crypto::ProofType;
use crate::wallet::key_management::{verify, CredentialSignature, IssuerPublicKey};
use crate::zkp::input::{canonical_bytes_from_input, ZkInput};
use crate::zkp::limbs::Uint512;
use log::{debug, info};
use std::sync::Arc;

/// External proof engine.
pub trait ProofBackend: Send + Sync {
    /// Produces a proof blob for `input`. Fails if the statement is false.
    fn generate(&self, input: &ZkInput) -> Result<Vec<u8>, ProverError>;

    /// `Ok(false)` for a well-formed proof of a false statement.
    fn verify(&self, proof: &[u8]) -> Result<bool, ProverError>;
}

/// Runs `backend.generate` on the blocking pool.
pub async fn generate_proof(backend: Arc<dyn ProofBackend>, input: ZkInput) -> Result<Vec<u8>, ProverError> {
    tokio::task::spawn_blocking(move || backend.generate(&input))
        .await
        .map_err(|e| ProverError::Task(e.to_string()))?
}

/// Runs `backend.verify` on the blocking pool.
pub async fn verify_proof(backend: Arc<dyn ProofBackend>, proof: Vec<u8>) -> Result<bool, ProverError> {
    tokio::task::spawn_blocking(move || backend.verify(&proof))
        .await
        .map_err(|e| ProverError::Task(e.to_string()))?
}

/// Non-zero-knowledge backend that checks the credential statement directly.
///
/// The statement:
/// - `issuer_id` equals the credential's issuer key, which is a secp256k1 key
/// - `subject_address` equals the credential's subject id
/// - the signature verifies over the canonical bytes rebuilt from the fields
/// - the credential has not expired at `current_date`
#[derive(Debug, Clone, Copy, Default)]
pub struct TransparentBackend {
    proof_type: ProofType,
}

impl TransparentBackend {
    pub fn new(proof_type: ProofType) -> Self {
        TransparentBackend { proof_type }
    }

    /// Returns the first failing clause, or `None` when the statement holds.
    fn check(&self, input: &ZkInput) -> Result<Option<String>, ProverError> {
        let cred = &input.cred;
        if input.issuer_id != cred.isr_id_k {
            return Ok(Some("issuer id does not match credential issuer".into()));
        }
        if input.subject_address != cred.sbj_id_k {
            return Ok(Some("subject address does not match credential subject".into()));
        }
        if cred.isr_id_t != ID_SECP256K1_KEY {
            return Ok(Some(format!("issuer id type {} is not a secp256k1 key", cred.isr_id_t)));
        }
        if cred.exd != 0 && i128::from(input.current_date) >= i128::from(cred.exd) {
            return Ok(Some("credential expired".into()));
        }

        let message = canonical_bytes_from_input(input)?;
        let Ok(public_key) = IssuerPublicKey::from_bytes(Uint512::from_abi(&cred.isr_id_k)?.as_bytes()) else {
            return Ok(Some("issuer key is not a curve point".into()));
        };
        let Ok(signature) = CredentialSignature::from_bytes(Uint512::from_abi(&input.sign)?.as_bytes()) else {
            return Ok(Some("signature is malformed".into()));
        };
        if !verify(self.proof_type, &message, &signature, &public_key) {
            return Ok(Some("issuer signature does not verify".into()));
        }
        Ok(None)
    }
}

impl ProofBackend for TransparentBackend {
    fn generate(&self, input: &ZkInput) -> Result<Vec<u8>, ProverError> {
        if let Some(reason) = self.check(input)? {
            return Err(ProverError::Unsatisfied(reason));
        }
        info!("generated transparent proof at {}", input.current_date);
        serde_json::to_vec(input).map_err(|e| ProverError::MalformedProof(e.to_string()))
    }

    fn verify(&self, proof: &[u8]) -> Result<bool, ProverError> {
        let input: ZkInput =
            serde_json::from_slice(proof).map_err(|e| ProverError::MalformedProof(e.to_string()))?;
        match self.check(&input)? {
            None => Ok(true),
            Some(reason) => {
                debug!("transparent proof rejected: {}", reason);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::tests::fixture_credential;
    use crate::wallet::key_management::tests::FIXTURE_SIGNATURE;
    use crate::zkp::input::build_zk_input;

    fn fixture_input(current_date: i64) -> ZkInput {
        let signature = CredentialSignature::from_hex(FIXTURE_SIGNATURE).unwrap();
        build_zk_input(&fixture_credential(), &signature, current_date).unwrap()
    }

    #[test]
    fn test_generate_and_verify() {
        let backend = TransparentBackend::default();
        let proof = backend.generate(&fixture_input(1_700_000_000_000)).unwrap();
        assert!(backend.verify(&proof).unwrap());
    }

    #[test]
    fn test_generate_refuses_tampered_credential() {
        let backend = TransparentBackend::default();
        let mut input = fixture_input(0);
        input.cred.sbj_cc = 250;
        match backend.generate(&input) {
            Err(ProverError::Unsatisfied(reason)) => assert!(reason.contains("signature")),
            other => panic!("unexpected result: {:?}", other),
        }

        let mut wrong_subject = fixture_input(0);
        wrong_subject.subject_address = format!("0x{}", "11".repeat(32));
        assert!(matches!(backend.generate(&wrong_subject), Err(ProverError::Unsatisfied(_))));
    }

    #[test]
    fn test_verify_rejects_tampered_blob() {
        let backend = TransparentBackend::default();
        let mut input = fixture_input(0);
        input.cred.sbj_bd += 1;
        let blob = serde_json::to_vec(&input).unwrap();
        assert!(!backend.verify(&blob).unwrap());
        assert!(matches!(backend.verify(b"not a proof"), Err(ProverError::MalformedProof(_))));
    }

    #[test]
    fn test_wrong_hash_function_rejects() {
        let backend = TransparentBackend::new(ProofType::Keccak256Secp256k1);
        assert!(backend.generate(&fixture_input(0)).is_err());
    }

    #[test]
    fn test_expiry_is_checked() {
        let backend = TransparentBackend::default();
        let mut input = fixture_input(2_000);
        input.cred.exd = 1_000;
        match backend.generate(&input) {
            Err(ProverError::Unsatisfied(reason)) => assert_eq!(reason, "credential expired"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_async_helpers() {
        let backend: Arc<dyn ProofBackend> = Arc::new(TransparentBackend::default());
        let proof = generate_proof(backend.clone(), fixture_input(0)).await.unwrap();
        assert!(verify_proof(backend, proof).await.unwrap());
    }
}
