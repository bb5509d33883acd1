// src/wallet/credential_storage.rs
//! Credential storage for the holder side.
//!
//! Provides an in-memory store of issued credentials keyed by identifier.
//! Identifiers are either chosen by the caller or derived from the issuer
//! signature.

use crate::models::credential::IssuedCredential;
use crate::utils::crypto::sha256;
use ethers::utils::hex;
use std::collections::HashMap;

/// In-memory storage for issued credentials.
///
/// Not synchronised; the HTTP server wraps it in a mutex.
#[derive(Debug, Default)]
pub struct CredentialStorage {
    credentials: HashMap<String, IssuedCredential>,
}

impl CredentialStorage {
    pub fn new() -> Self {
        CredentialStorage { credentials: HashMap::new() }
    }

    /// Stores a credential under `id`.
    ///
    /// # Behavior
    /// - Overwrites an existing credential with the same ID
    /// - Does not verify the credential
    pub fn store_credential(&mut self, id: String, credential: IssuedCredential) {
        self.credentials.insert(id, credential);
    }

    /// Stores a credential under its derived ID and returns that ID.
    pub fn store_issued(&mut self, credential: IssuedCredential) -> String {
        let id = credential_id(&credential);
        self.credentials.insert(id.clone(), credential);
        id
    }

    pub fn get_credential(&self, id: &str) -> Option<&IssuedCredential> {
        self.credentials.get(id)
    }

    pub fn count_credentials(&self) -> usize {
        self.credentials.len()
    }

    pub fn contains_credential(&self, id: &str) -> bool {
        self.credentials.contains_key(id)
    }

    /// Returns `true` if a credential was removed.
    pub fn remove_credential(&mut self, id: &str) -> bool {
        self.credentials.remove(id).is_some()
    }
}

/// SHA-256 of the compact issuer signature, hex encoded.
///
/// Signatures are deterministic, so re-issuing identical credential bytes
/// with the same key yields the same ID.
pub fn credential_id(credential: &IssuedCredential) -> String {
    hex::encode(sha256(credential.proof.signature.compact()))
}
