// src/error.rs
//! Error taxonomy for the credential pipeline.
//!
//! Each stage has its own error kind so callers can tell malformed input
//! (encoding, schema mismatch, buffer overrun) apart from failures of the
//! external collaborators (wallet, prover, issuance service). A negative
//! signature or proof verification is reported as `Ok(false)`, never as an
//! error.

use thiserror::Error;

/// Malformed input to a single encoding step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("step `{step}` expects {expected} input, got {found}")]
    UnexpectedKind {
        step: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("hex string has odd length {0}")]
    OddLengthHex(usize),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("cannot encode negative integer {0} as unsigned")]
    NegativeInteger(String),

    #[error("value {value} exceeds {bits} bits")]
    WidthExceeded { bits: u64, value: String },

    #[error("unknown encoding step `{0}`")]
    UnknownStep(String),

    #[error("limb `{0}` is not a 16-byte hex word")]
    InvalidLimb(String),
}

/// Structural mismatch between a schema and a record, or a malformed schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaMismatchError {
    #[error("record has no field `{path}` required by the schema")]
    MissingField { path: String },

    #[error("schema expects a nested record at `{path}`, found a primitive")]
    ExpectedRecord { path: String },

    #[error("schema expects a primitive at `{path}`, found a nested record")]
    ExpectedPrimitive { path: String },

    #[error("unknown encoding step `{step}` at `{path}`")]
    UnknownStep { path: String, step: String },

    #[error("malformed schema at `{path}`: {reason}")]
    Malformed { path: String, reason: String },

    #[error("invalid record at `{path}`: {reason}")]
    InvalidRecord { path: String, reason: String },

    #[error("field `{path}` does not encode to bytes")]
    NonByteLeaf { path: String },
}

/// Failure while walking a record against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("field `{path}`: {source}")]
    Encoding {
        path: String,
        #[source]
        source: EncodingError,
    },

    #[error(transparent)]
    Schema(#[from] SchemaMismatchError),
}

/// The sequential slicer was asked for bytes past the end of its buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("buffer exhausted: requested {requested} bytes at offset {offset} of {len}")]
pub struct BufferExhaustedError {
    pub offset: usize,
    pub requested: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signature carries no recovery id")]
    MissingRecoveryId,

    #[error("issuer key type {0} cannot verify signatures")]
    UnsupportedIssuerKey(u16),

    #[error("signing failed")]
    Failed,
}

/// Failures surfaced by the wallet boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet provider unavailable: {0}")]
    Unavailable(String),

    #[error("user rejected the request")]
    UserRejected,

    #[error("method `{0}` is not supported by the provider")]
    UnsupportedMethod(String),

    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),

    #[error("wallet request timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("statement does not hold: {0}")]
    Unsatisfied(String),

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("prover task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("issuance request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("issuance service rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Schema(#[from] SchemaMismatchError),

    #[error(transparent)]
    BufferExhausted(#[from] BufferExhaustedError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    Issuance(#[from] IssuanceError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_carries_path() {
        let err = TransformError::Encoding {
            path: "sbj.id.k".into(),
            source: EncodingError::OddLengthHex(3),
        };
        assert_eq!(err.to_string(), "field `sbj.id.k`: hex string has odd length 3");
    }

    #[test]
    fn test_buffer_exhausted_display() {
        let err = BufferExhaustedError { offset: 8, requested: 4, len: 10 };
        assert_eq!(
            err.to_string(),
            "buffer exhausted: requested 4 bytes at offset 8 of 10"
        );
    }

    #[test]
    fn test_kinds_stay_distinguishable_after_conversion() {
        let err: Error = SchemaMismatchError::MissingField { path: "sch".into() }.into();
        assert!(matches!(err, Error::Schema(SchemaMismatchError::MissingField { .. })));

        let err: Error = BufferExhaustedError { offset: 0, requested: 1, len: 0 }.into();
        assert!(matches!(err, Error::BufferExhausted(_)));
    }
}
