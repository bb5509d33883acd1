// src/transform/canonical.rs
//! Canonical byte form of a record.
//!
//! The canonical bytes are the concatenation, in schema order, of every
//! prepared value. Every leaf of a signing schema must therefore end in a
//! byte encoding; integers are never re-encoded here.

use crate::error::{SchemaMismatchError, TransformError};
use crate::models::record::Record;
use crate::transform::schema::Schema;
use crate::transform::value::Value;
use crate::transform::walker::prepare_named;
use crate::utils::crypto::ProofType;

/// Concatenates the prepared values of `record` under `schema`.
pub fn canonicalize(record: &Record, schema: &Schema) -> Result<Vec<u8>, TransformError> {
    let mut out = Vec::new();
    for (path, value) in prepare_named(record, schema)?.into_entries() {
        match value {
            Value::Bytes(bytes) => out.extend_from_slice(&bytes),
            _ => return Err(SchemaMismatchError::NonByteLeaf { path }.into()),
        }
    }
    Ok(out)
}

/// Field boundaries of the canonical bytes: `(path, length)` in order.
pub fn canonical_layout(record: &Record, schema: &Schema) -> Result<Vec<(String, usize)>, TransformError> {
    prepare_named(record, schema)?
        .into_entries()
        .into_iter()
        .map(|(path, value)| match value {
            Value::Bytes(bytes) => Ok((path, bytes.len())),
            _ => Err(SchemaMismatchError::NonByteLeaf { path }.into()),
        })
        .collect()
}

/// Hash of the canonical bytes under the proof type's hash function.
pub fn canonical_digest(
    record: &Record,
    schema: &Schema,
    proof_type: ProofType,
) -> Result<[u8; 32], TransformError> {
    canonicalize(record, schema).map(|bytes| proof_type.digest(&bytes))
}
