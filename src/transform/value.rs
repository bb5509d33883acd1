// src/transform/value.rs
//! Values flowing through an encoding chain.

use crate::models::record::Field;
use crate::utils::serialization::to_hex_prefixed;
use num_bigint::{BigInt, BigUint};
use serde_json::Value as JsonValue;

/// A value before, between or after encoding steps.
///
/// Record primitives enter as `Text` or `Integer`; every step yields `Bytes`
/// or `Uint`, so a prepared value is always one of those two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Integer(BigInt),
    Bytes(Vec<u8>),
    Uint(BigUint),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Bytes(_) => "bytes",
            Value::Uint(_) => "uint",
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<&BigUint> {
        match self {
            Value::Uint(u) => Some(u),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// JSON rendering: bytes as `0x` hex, integers as decimal strings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Integer(i) => JsonValue::String(i.to_string()),
            Value::Bytes(b) => JsonValue::String(to_hex_prefixed(b)),
            Value::Uint(u) => JsonValue::String(u.to_string()),
        }
    }

    /// Converts a record primitive. Nested records have no value form.
    pub fn from_field(field: &Field) -> Option<Self> {
        match field {
            Field::Text(s) => Some(Value::Text(s.clone())),
            Field::Integer(i) => Some(Value::Integer(i.clone())),
            Field::Record(_) => None,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<BigUint> for Value {
    fn from(value: BigUint) -> Self {
        Value::Uint(value)
    }
}
