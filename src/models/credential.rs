// src/models/credential.rs
//! Passport credential data model.
//!
//! Field names are the short wire names used by issuers and by the circuit
//! (`isr`, `sch`, `isd`, `exd`, `sbj`). Timestamps are integer milliseconds.

use crate::error::SigningError;
use crate::models::record::Record;
use crate::utils::crypto::ProofType;
use crate::wallet::key_management::{CredentialSignature, IssuerPublicKey};
use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Identity type: raw secp256k1 public key, `x || y` hex.
pub const ID_SECP256K1_KEY: u16 = 1;
/// Identity type: 20-byte Ethereum address, hex.
pub const ID_ETH_ADDRESS: u16 = 2;

/// Typed identity: `t` says how to read `k`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub t: u16,
    pub k: String,
}

impl IdentityKey {
    pub fn secp256k1(public_key: &IssuerPublicKey) -> Self {
        IdentityKey { t: ID_SECP256K1_KEY, k: public_key.to_hex() }
    }

    /// Address identity, lowercased with any `0x` prefix removed.
    pub fn eth_address(address: &str) -> Self {
        let trimmed = address.trim_start_matches("0x").trim_start_matches("0X");
        IdentityKey { t: ID_ETH_ADDRESS, k: trimmed.to_lowercase() }
    }

    fn to_record(&self) -> Record {
        Record::new().with("t", self.t).with("k", self.k.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuerInfo {
    pub id: IdentityKey,
}

/// Identity document reference (passport number and document type).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub t: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PassportSubject {
    pub id: IdentityKey,
    /// Birth date, milliseconds since 1900-01-01. Also read from a
    /// `YYYY-MM-DD` date.
    #[serde(deserialize_with = "birth_date")]
    pub bd: i64,
    /// ISO 3166 numeric country code.
    pub cc: u16,
    pub doc: DocumentRef,
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "ln", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// A passport credential as signed by an issuer.
///
/// # Fields
/// - `isr`: issuer identity
/// - `sch`: schema number
/// - `isd`: issuance date (ms since the Unix epoch)
/// - `exd`: expiration date (ms since the Unix epoch), `0` for none
/// - `sbj`: subject claims
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PassportCredential {
    #[serde(alias = "issuer")]
    pub isr: IssuerInfo,
    pub sch: u16,
    pub isd: i64,
    pub exd: i64,
    #[serde(alias = "subject")]
    pub sbj: PassportSubject,
}

impl PassportCredential {
    /// Generic record view, consumed by the schema walker.
    pub fn to_record(&self) -> Record {
        let doc = Record::new()
            .with("id", self.sbj.doc.id.as_str())
            .with("t", self.sbj.doc.t);
        let mut sbj = Record::new()
            .with("id", self.sbj.id.to_record())
            .with("bd", self.sbj.bd)
            .with("cc", self.sbj.cc)
            .with("doc", doc);
        if let Some(first_name) = &self.sbj.first_name {
            sbj.insert("fn", first_name.as_str());
        }
        if let Some(last_name) = &self.sbj.last_name {
            sbj.insert("ln", last_name.as_str());
        }

        Record::new()
            .with("isr", Record::new().with("id", self.isr.id.to_record()))
            .with("sch", self.sch)
            .with("isd", self.isd)
            .with("exd", self.exd)
            .with("sbj", sbj)
    }

    /// `exd == 0` never expires.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.exd != 0 && now_ms >= self.exd
    }

    /// The issuer key embedded in the credential. Only `t = 1` carries one.
    pub fn issuer_public_key(&self) -> Result<IssuerPublicKey, SigningError> {
        if self.isr.id.t != ID_SECP256K1_KEY {
            return Err(SigningError::UnsupportedIssuerKey(self.isr.id.t));
        }
        IssuerPublicKey::from_hex(&self.isr.id.k)
    }
}

/// Signature envelope attached at issuance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialProof {
    #[serde(rename = "type", default)]
    pub proof_type: ProofType,
    pub signature: CredentialSignature,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub credential: PassportCredential,
    pub proof: CredentialProof,
}

/// Milliseconds between 1900-01-01 and `date`; negative before 1900.
pub fn ms_since_1900(date: NaiveDate) -> i64 {
    match NaiveDate::from_ymd_opt(1900, 1, 1) {
        Some(epoch) => date.signed_duration_since(epoch).num_milliseconds(),
        None => 0,
    }
}

fn birth_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("birth date {} is not a 64-bit integer", n))),
        JsonValue::String(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(ms_since_1900)
            .map_err(|e| D::Error::custom(format!("invalid birth date `{}`: {}", s, e))),
        other => Err(D::Error::custom(format!("invalid birth date {}", other))),
    }
}
