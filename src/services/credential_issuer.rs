// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Local issuer for passport credentials. Stamps issuance and expiry dates,
//! canonicalises the credential with `PASSPORT_SIGN_SCHEMA` and signs the
//! hash of the canonical bytes with the issuer key.
//!
//! Production credentials normally come pre-signed from a remote issuance
//! service (see `issuance_client`); this issuer covers demos, tests and
//! self-hosted deployments.

use crate::error::{Error, SigningError};
use crate::models::credential::{
    CredentialProof, IdentityKey, IssuedCredential, IssuerInfo, PassportCredential, PassportSubject,
};
use crate::transform::canonical::canonicalize;
use crate::transform::passport::PASSPORT_SIGN_SCHEMA;
use crate::utils::crypto::ProofType;
use crate::wallet::key_management::IssuerKey;
use chrono::Utc;
use log::info;

const MS_PER_DAY: i64 = 86_400_000;

/// Signs passport credentials with a single issuer key.
pub struct CredentialIssuer {
    key: IssuerKey,
    proof_type: ProofType,
    /// Validity window in days; `0` issues credentials that never expire.
    validity_days: u32,
}

impl CredentialIssuer {
    /// Creates a new CredentialIssuer
    ///
    /// # Arguments
    /// * `key` - Issuer signing key
    /// * `proof_type` - Hash and curve recorded in every issued proof
    /// * `validity_days` - Days until expiry, `0` for none
    pub fn new(key: IssuerKey, proof_type: ProofType, validity_days: u32) -> Self {
        CredentialIssuer { key, proof_type, validity_days }
    }

    /// The issuer identity embedded in every credential (`t = 1`).
    pub fn issuer_identity(&self) -> IssuerInfo {
        IssuerInfo { id: IdentityKey::secp256k1(self.key.public_key()) }
    }

    pub fn proof_type(&self) -> ProofType {
        self.proof_type
    }

    /// Issues a credential for `subject`, dated now.
    pub fn issue(&self, sch: u16, subject: PassportSubject) -> Result<IssuedCredential, Error> {
        self.issue_at(sch, subject, Utc::now().timestamp_millis())
    }

    /// Issues a credential with issuance date `isd` (ms since the Unix epoch).
    pub fn issue_at(&self, sch: u16, subject: PassportSubject, isd: i64) -> Result<IssuedCredential, Error> {
        let exd = match self.validity_days {
            0 => 0,
            days => isd + i64::from(days) * MS_PER_DAY,
        };
        let credential = PassportCredential {
            isr: self.issuer_identity(),
            sch,
            isd,
            exd,
            sbj: subject,
        };
        self.sign_credential(credential)
    }

    /// Signs an already assembled credential.
    ///
    /// # Errors
    /// - The credential names a different issuer
    /// - A field cannot be canonicalised
    pub fn sign_credential(&self, credential: PassportCredential) -> Result<IssuedCredential, Error> {
        if credential.isr != self.issuer_identity() {
            return Err(SigningError::InvalidPublicKey(
                "credential names a different issuer".into(),
            )
            .into());
        }

        let canonical = canonicalize(&credential.to_record(), &PASSPORT_SIGN_SCHEMA)?;
        let signature = self.key.sign(self.proof_type, &canonical)?;
        info!(
            "issued schema {} credential for {} ({} canonical bytes)",
            credential.sch,
            credential.sbj.id.k,
            canonical.len()
        );

        Ok(IssuedCredential {
            credential,
            proof: CredentialProof { proof_type: self.proof_type, signature },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::tests::fixture_credential;
    use crate::models::credential::DocumentRef;
    use crate::wallet::key_management::tests::{FIXTURE_SECRET, FIXTURE_SIGNATURE};
    use crate::wallet::key_management::verify;
    use ethers::utils::hex;

    fn issuer(validity_days: u32) -> CredentialIssuer {
        CredentialIssuer::new(
            IssuerKey::from_hex(FIXTURE_SECRET).unwrap(),
            ProofType::Sha256Secp256k1,
            validity_days,
        )
    }

    fn subject() -> PassportSubject {
        PassportSubject {
            id: IdentityKey::eth_address("0x9ebd816fa99ce2101091203abd135fd08ce7c8ab"),
            bd: 3158350217000,
            cc: 840,
            doc: DocumentRef { id: "I123123K".into(), t: 1 },
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn test_issue_reproduces_fixture_signature() {
        let issued = issuer(0).issue_at(2, subject(), 1696790497147).unwrap();
        assert_eq!(issued.credential, fixture_credential());
        assert_eq!(hex::encode(issued.proof.signature.compact()), FIXTURE_SIGNATURE);
        assert_eq!(issued.proof.proof_type, ProofType::Sha256Secp256k1);
    }

    #[test]
    fn test_validity_window() {
        let issued = issuer(30).issue_at(2, subject(), 1_000).unwrap();
        assert_eq!(issued.credential.exd, 1_000 + 30 * MS_PER_DAY);
        assert_eq!(issuer(0).issue_at(2, subject(), 1_000).unwrap().credential.exd, 0);
    }

    #[test]
    fn test_issue_now_signs_verifiable_bytes() {
        let issuer = issuer(0);
        let issued = issuer.issue(2, subject()).unwrap();
        assert!(issued.credential.isd > 1_696_790_497_147);

        let canonical = canonicalize(&issued.credential.to_record(), &PASSPORT_SIGN_SCHEMA).unwrap();
        let key = issued.credential.issuer_public_key().unwrap();
        assert!(verify(issued.proof.proof_type, &canonical, &issued.proof.signature, &key));
    }

    #[test]
    fn test_refuses_foreign_issuer() {
        let mut credential = fixture_credential();
        credential.isr.id.k = "ab".repeat(64);
        assert!(matches!(
            issuer(0).sign_credential(credential),
            Err(Error::Signing(SigningError::InvalidPublicKey(_)))
        ));
    }

    #[test]
    fn test_bad_subject_key_is_a_transform_error() {
        let mut bad = subject();
        bad.id.k = "abc".into();
        assert!(matches!(issuer(0).issue(2, bad), Err(Error::Transform(_))));
    }
}
