// src/utils/crypto.rs
//! Hash functions and proof-scheme identifiers.
//!
//! The hash used before signing is part of the credential's declared proof
//! type, so issuer and verifier always agree on it.

use ethers::utils::keccak256;
use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(digest(&SHA256, data).as_ref());
    out
}

/// Keccak-256 of `data` (Ethereum's hash).
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Hash + signature scheme a credential proof was produced with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofType {
    /// SHA-256 over the canonical bytes, secp256k1 ECDSA.
    #[default]
    Sha256Secp256k1,
    /// Keccak-256 over the canonical bytes, secp256k1 ECDSA.
    Keccak256Secp256k1,
}

impl ProofType {
    pub fn digest(self, data: &[u8]) -> [u8; 32] {
        match self {
            ProofType::Sha256Secp256k1 => sha256(data),
            ProofType::Keccak256Secp256k1 => hash_data(data),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProofType::Sha256Secp256k1 => "Sha256Secp256k1",
            ProofType::Keccak256Secp256k1 => "Keccak256Secp256k1",
        }
    }
}

impl fmt::Display for ProofType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::utils::hex;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_keccak_known_vector() {
        assert_eq!(
            hex::encode(hash_data(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_proof_type_serde_names() {
        assert_eq!(
            serde_json::to_string(&ProofType::Sha256Secp256k1).unwrap(),
            "\"Sha256Secp256k1\""
        );
        let parsed: ProofType = serde_json::from_str("\"Keccak256Secp256k1\"").unwrap();
        assert_eq!(parsed, ProofType::Keccak256Secp256k1);
        assert_eq!(ProofType::default().to_string(), "Sha256Secp256k1");
    }
}
