// src/services/verifier.rs
//! Credential Verifier Service
//!
//! Re-derives the canonical bytes of an issued credential and checks the
//! attached signature under the declared proof type.
//!
//! ## Trust
//! [`Verifier::verify`] checks against the issuer key embedded in the
//! credential itself. Whether that key belongs to a trusted issuer is for
//! the caller to decide, e.g. with [`Verifier::verify_with_key`] against a
//! registry of known issuers.

use crate::error::Error;
use crate::models::credential::IssuedCredential;
use crate::transform::canonical::canonicalize;
use crate::transform::passport::PASSPORT_SIGN_SCHEMA;
use crate::wallet::key_management::{verify, IssuerPublicKey};
use log::info;

/// Stateless signature verifier for passport credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier;

impl Verifier {
    pub fn new() -> Self {
        Verifier
    }

    /// Verifies against the embedded issuer key.
    ///
    /// # Returns
    /// - `Ok(true)` / `Ok(false)` for a valid / invalid signature
    /// - `Err` if the issuer id is not a secp256k1 key or a field cannot be
    ///   canonicalised
    pub fn verify(&self, issued: &IssuedCredential) -> Result<bool, Error> {
        let key = issued.credential.issuer_public_key()?;
        self.verify_with_key(issued, &key)
    }

    /// Verifies against an explicitly trusted key.
    pub fn verify_with_key(&self, issued: &IssuedCredential, key: &IssuerPublicKey) -> Result<bool, Error> {
        let canonical = canonicalize(&issued.credential.to_record(), &PASSPORT_SIGN_SCHEMA)?;
        let valid = verify(issued.proof.proof_type, &canonical, &issued.proof.signature, key);
        info!(
            "verified {} credential for {}: {}",
            issued.proof.proof_type,
            issued.credential.sbj.id.k,
            if valid { "valid" } else { "invalid" }
        );
        Ok(valid)
    }

    /// Signature check plus expiry at `now_ms`.
    pub fn verify_at(&self, issued: &IssuedCredential, now_ms: i64) -> Result<bool, Error> {
        if issued.credential.is_expired(now_ms) {
            info!("credential for {} expired at {}", issued.credential.sbj.id.k, issued.credential.exd);
            return Ok(false);
        }
        self.verify(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SigningError;
    use crate::models::credential::tests::fixture_credential;
    use crate::models::credential::{CredentialProof, IdentityKey, ID_ETH_ADDRESS};
    use crate::utils::crypto::ProofType;
    use crate::wallet::key_management::tests::FIXTURE_SIGNATURE;
    use crate::wallet::key_management::{CredentialSignature, IssuerKey};

    fn issued() -> IssuedCredential {
        IssuedCredential {
            credential: fixture_credential(),
            proof: CredentialProof {
                proof_type: ProofType::Sha256Secp256k1,
                signature: CredentialSignature::from_hex(FIXTURE_SIGNATURE).unwrap(),
            },
        }
    }

    #[test]
    fn test_fixture_verifies() {
        assert!(Verifier::new().verify(&issued()).unwrap());
    }

    #[test]
    fn test_tampered_fields_fail() {
        let verifier = Verifier::new();

        let mut changed_country = issued();
        changed_country.credential.sbj.cc = 250;
        assert!(!verifier.verify(&changed_country).unwrap());

        let mut changed_doc = issued();
        changed_doc.credential.sbj.doc.id = "I123123L".into();
        assert!(!verifier.verify(&changed_doc).unwrap());

        let mut changed_hash = issued();
        changed_hash.proof.proof_type = ProofType::Keccak256Secp256k1;
        assert!(!verifier.verify(&changed_hash).unwrap());
    }

    #[test]
    fn test_names_are_not_signed() {
        let mut named = issued();
        named.credential.sbj.first_name = Some("JOHN".into());
        assert!(Verifier::new().verify(&named).unwrap());
    }

    #[test]
    fn test_non_key_issuer_is_an_error() {
        let mut issued = issued();
        issued.credential.isr.id = IdentityKey::eth_address("0x9ebd816fa99ce2101091203abd135fd08ce7c8ab");
        assert!(matches!(
            Verifier::new().verify(&issued),
            Err(Error::Signing(SigningError::UnsupportedIssuerKey(ID_ETH_ADDRESS)))
        ));
    }

    #[test]
    fn test_verify_with_other_key_fails() {
        let other = IssuerKey::random();
        assert!(!Verifier::new().verify_with_key(&issued(), other.public_key()).unwrap());
    }

    #[test]
    fn test_verify_at_checks_expiry() {
        let verifier = Verifier::new();
        assert!(verifier.verify_at(&issued(), i64::MAX).unwrap());

        let mut expiring = issued();
        expiring.credential.exd = 10;
        assert!(!verifier.verify_at(&expiring, 10).unwrap());
    }
}
