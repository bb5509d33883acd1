// src/wallet/key_management.rs
//! Issuer key management and the credential signing contract.
//!
//! Uses the following cryptographic primitives:
//! - secp256k1 ECDSA (via `k256`) with RFC 6979 deterministic nonces and
//!   low-S normalisation
//! - the hash named by the credential's [`ProofType`]
//!
//! The signed message is always the hash of the canonical credential bytes.

use crate::error::SigningError;
use crate::transform::encoder::decode_hex;
use crate::utils::crypto::ProofType;
use ethers::utils::hex;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Uncompressed secp256k1 public key without the SEC1 tag: `x || y`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IssuerPublicKey([u8; 64]);

impl IssuerPublicKey {
    /// Parses 64 raw bytes, checking the point is on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigningError> {
        let raw: [u8; 64] = bytes.try_into().map_err(|_| {
            SigningError::InvalidPublicKey(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        let key = IssuerPublicKey(raw);
        key.verifying_key()?;
        Ok(key)
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, SigningError> {
        let bytes = decode_hex(hex_key).map_err(|e| SigningError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.as_affine().to_encoded_point(false);
        let mut raw = [0u8; 64];
        // skip the 0x04 tag
        raw.copy_from_slice(&point.as_bytes()[1..]);
        IssuerPublicKey(raw)
    }

    pub fn verifying_key(&self) -> Result<VerifyingKey, SigningError> {
        let mut sec1 = [0u8; 65];
        sec1[0] = 0x04;
        sec1[1..].copy_from_slice(&self.0);
        VerifyingKey::from_sec1_bytes(&sec1)
            .map_err(|_| SigningError::InvalidPublicKey("point is not on secp256k1".into()))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex without prefix, as embedded in credentials.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for IssuerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IssuerPublicKey({})", self.to_hex())
    }
}

impl Serialize for IssuerPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for IssuerPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        IssuerPublicKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Compact `r || s` signature, optionally with its recovery id.
///
/// Hex form is 64 bytes, or 65 when the recovery byte is known.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CredentialSignature {
    compact: [u8; 64],
    recovery_id: Option<u8>,
}

impl CredentialSignature {
    fn new(signature: &Signature, recovery_id: Option<RecoveryId>) -> Self {
        let mut compact = [0u8; 64];
        compact.copy_from_slice(&signature.to_bytes());
        CredentialSignature {
            compact,
            recovery_id: recovery_id.map(|id| id.to_byte()),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SigningError> {
        let (compact, recovery_id) = match bytes.len() {
            64 => (bytes, None),
            65 => (&bytes[..64], Some(bytes[64])),
            n => {
                return Err(SigningError::MalformedSignature(format!(
                    "expected 64 or 65 bytes, got {}",
                    n
                )))
            }
        };
        if let Some(id) = recovery_id {
            if RecoveryId::from_byte(id).is_none() {
                return Err(SigningError::MalformedSignature(format!("bad recovery id {}", id)));
            }
        }
        let mut raw = [0u8; 64];
        raw.copy_from_slice(compact);
        Ok(CredentialSignature { compact: raw, recovery_id })
    }

    pub fn from_hex(hex_sig: &str) -> Result<Self, SigningError> {
        let bytes = decode_hex(hex_sig).map_err(|e| SigningError::MalformedSignature(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// The 64-byte `r || s` form handed to the circuit.
    pub fn compact(&self) -> &[u8; 64] {
        &self.compact
    }

    pub fn recovery_id(&self) -> Option<u8> {
        self.recovery_id
    }

    pub fn to_hex(&self) -> String {
        match self.recovery_id {
            Some(id) => format!("{}{:02x}", hex::encode(self.compact), id),
            None => hex::encode(self.compact),
        }
    }

    fn signature(&self) -> Result<Signature, SigningError> {
        Signature::from_slice(&self.compact).map_err(|e| SigningError::MalformedSignature(e.to_string()))
    }
}

impl fmt::Debug for CredentialSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialSignature({})", self.to_hex())
    }
}

impl Serialize for CredentialSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CredentialSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CredentialSignature::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Issuer signing key.
///
/// # Security Notes
/// - The secret scalar is never exposed
/// - Deterministic nonces (RFC 6979): signing the same bytes twice yields
///   the same signature
#[derive(Clone)]
pub struct IssuerKey {
    signing_key: SigningKey,
    public_key: IssuerPublicKey,
}

impl IssuerKey {
    /// Generates a fresh key from the thread RNG.
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Loads a 32-byte secret scalar from hex (optional `0x`).
    pub fn from_hex(secret_hex: &str) -> Result<Self, SigningError> {
        let bytes = decode_hex(secret_hex).map_err(|_| SigningError::InvalidSecretKey)?;
        let signing_key = SigningKey::from_slice(&bytes).map_err(|_| SigningError::InvalidSecretKey)?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = IssuerPublicKey::from_verifying_key(signing_key.verifying_key());
        IssuerKey { signing_key, public_key }
    }

    pub fn public_key(&self) -> &IssuerPublicKey {
        &self.public_key
    }

    /// Hashes `message` with the proof type's hash and signs the digest.
    pub fn sign(&self, proof_type: ProofType, message: &[u8]) -> Result<CredentialSignature, SigningError> {
        let hash = proof_type.digest(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&hash)
            .map_err(|_| SigningError::Failed)?;
        Ok(CredentialSignature::new(&signature, Some(recovery_id)))
    }
}

impl fmt::Debug for IssuerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerKey")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Checks `signature` over `message` against `public_key`.
///
/// A mismatch is a normal `false` outcome, not an error.
pub fn verify(
    proof_type: ProofType,
    message: &[u8],
    signature: &CredentialSignature,
    public_key: &IssuerPublicKey,
) -> bool {
    let (Ok(key), Ok(sig)) = (public_key.verifying_key(), signature.signature()) else {
        return false;
    };
    key.verify_prehash(&proof_type.digest(message), &sig).is_ok()
}

/// Recovers the signer's public key. Requires a recovery id.
pub fn recover(
    proof_type: ProofType,
    message: &[u8],
    signature: &CredentialSignature,
) -> Result<IssuerPublicKey, SigningError> {
    let id = signature.recovery_id.ok_or(SigningError::MissingRecoveryId)?;
    let recovery_id = RecoveryId::from_byte(id)
        .ok_or_else(|| SigningError::MalformedSignature(format!("bad recovery id {}", id)))?;
    let key = VerifyingKey::recover_from_prehash(&proof_type.digest(message), &signature.signature()?, recovery_id)
        .map_err(|e| SigningError::MalformedSignature(e.to_string()))?;
    Ok(IssuerPublicKey::from_verifying_key(&key))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FIXTURE_SECRET: &str = "c7c2e7d5584bb3be90fa7f3767ecdb6c62d9486baa9be385c93b82e165fadd5f";
    pub(crate) const FIXTURE_PUBLIC: &str = "695dad8d0d6ca804ffad3c1809c32bcf31b3cef11e1618f28df7af6716a42beaa18e3aee6fec3afd219bb6853a834b72f234335a17c6519c7e0eaca9f29c0a97";
    pub(crate) const FIXTURE_CANONICAL: &str = "0001695dad8d0d6ca804ffad3c1809c32bcf31b3cef11e1618f28df7af6716a42beaa18e3aee6fec3afd219bb6853a834b72f234335a17c6519c7e0eaca9f29c0a9700020000018b1098477b000000000000000000029ebd816fa99ce2101091203abd135fd08ce7c8ab000002df5c57bf280348000000000000000000000000000000000000000000000000493132333132334b0001";
    pub(crate) const FIXTURE_SIGNATURE: &str = "03482f78d9c7172627187ca6b4543194d86fe568ce566def1403ae722377db0e60b98540c3279bd4c13f8c17ac7fb1fbf6b55f22bc50d403291fe46bdffc1fd8";

    fn fixture_message() -> Vec<u8> {
        hex::decode(FIXTURE_CANONICAL).unwrap()
    }

    #[test]
    fn test_public_key_from_secret() {
        let key = IssuerKey::from_hex(FIXTURE_SECRET).unwrap();
        assert_eq!(key.public_key().to_hex(), FIXTURE_PUBLIC);
        let prefixed = IssuerKey::from_hex(&format!("0x{}", FIXTURE_SECRET)).unwrap();
        assert_eq!(prefixed.public_key(), key.public_key());
    }

    #[test]
    fn test_signature_matches_fixture() {
        let key = IssuerKey::from_hex(FIXTURE_SECRET).unwrap();
        let signature = key.sign(ProofType::Sha256Secp256k1, &fixture_message()).unwrap();
        assert_eq!(hex::encode(signature.compact()), FIXTURE_SIGNATURE);
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = IssuerKey::random();
        let a = key.sign(ProofType::Sha256Secp256k1, b"same bytes").unwrap();
        let b = key.sign(ProofType::Sha256Secp256k1, b"same bytes").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_verify_accepts_and_rejects_bit_flips() {
        let key = IssuerKey::from_hex(FIXTURE_SECRET).unwrap();
        let message = fixture_message();
        let signature = key.sign(ProofType::Sha256Secp256k1, &message).unwrap();
        assert!(verify(ProofType::Sha256Secp256k1, &message, &signature, key.public_key()));

        for bit in 0..message.len() * 8 {
            let mut flipped = message.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            assert!(!verify(ProofType::Sha256Secp256k1, &flipped, &signature, key.public_key()));
        }

        // wrong hash function for the same bytes
        assert!(!verify(ProofType::Keccak256Secp256k1, &message, &signature, key.public_key()));
        // wrong key
        assert!(!verify(ProofType::Sha256Secp256k1, &message, &signature, IssuerKey::random().public_key()));
    }

    #[test]
    fn test_recover_returns_signer() {
        let key = IssuerKey::random();
        let signature = key.sign(ProofType::Keccak256Secp256k1, b"credential").unwrap();
        assert_eq!(
            recover(ProofType::Keccak256Secp256k1, b"credential", &signature).unwrap(),
            *key.public_key()
        );

        let compact = CredentialSignature::from_bytes(signature.compact()).unwrap();
        assert_eq!(
            recover(ProofType::Keccak256Secp256k1, b"credential", &compact),
            Err(SigningError::MissingRecoveryId)
        );
    }

    #[test]
    fn test_signature_hex_forms() {
        let compact = CredentialSignature::from_hex(FIXTURE_SIGNATURE).unwrap();
        assert_eq!(compact.recovery_id(), None);
        assert_eq!(compact.to_hex(), FIXTURE_SIGNATURE);

        let with_id = CredentialSignature::from_hex(&format!("{}01", FIXTURE_SIGNATURE)).unwrap();
        assert_eq!(with_id.recovery_id(), Some(1));
        assert_eq!(with_id.to_hex(), format!("{}01", FIXTURE_SIGNATURE));

        assert!(CredentialSignature::from_hex("abcd").is_err());
        assert!(CredentialSignature::from_hex(&format!("{}09", FIXTURE_SIGNATURE)).is_err());
    }

    #[test]
    fn test_invalid_keys() {
        assert_eq!(IssuerKey::from_hex("zz").unwrap_err(), SigningError::InvalidSecretKey);
        assert_eq!(IssuerKey::from_hex(&"00".repeat(32)).unwrap_err(), SigningError::InvalidSecretKey);
        assert!(IssuerPublicKey::from_hex(&"ab".repeat(32)).is_err());
        assert!(IssuerPublicKey::from_hex(&"00".repeat(64)).is_err());
        assert!(IssuerPublicKey::from_hex(FIXTURE_PUBLIC).is_ok());
    }

    #[test]
    fn test_public_key_serde() {
        let key = IssuerPublicKey::from_hex(FIXTURE_PUBLIC).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", FIXTURE_PUBLIC));
        assert_eq!(serde_json::from_str::<IssuerPublicKey>(&json).unwrap(), key);
    }
}
