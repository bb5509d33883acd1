// src/transform/encoder.rs
//! Canonical encoder: applies one named step to one value.
//!
//! All functions here are pure. A chain is applied left to right and the
//! first failing step aborts the chain.

use crate::error::EncodingError;
use crate::transform::step::{Step, Width};
use crate::transform::value::Value;
use ethers::utils::hex;
use num_bigint::{BigInt, BigUint, Sign};

/// Applies a single step.
pub fn apply(step: Step, value: Value) -> Result<Value, EncodingError> {
    match step {
        Step::Utf8Bytes => match value {
            Value::Text(s) => Ok(Value::Bytes(s.into_bytes())),
            other => Err(unexpected(step, "text", &other)),
        },
        Step::HexBytes => match value {
            Value::Text(s) => decode_hex(&s).map(Value::Bytes),
            other => Err(unexpected(step, "text", &other)),
        },
        Step::BytesUint => match value {
            Value::Bytes(b) => Ok(Value::Uint(BigUint::from_bytes_be(&b))),
            other => Err(unexpected(step, "bytes", &other)),
        },
        Step::BytesUintMod(width) => match value {
            Value::Bytes(b) => Ok(Value::Uint(BigUint::from_bytes_be(&b) % modulus(width))),
            other => Err(unexpected(step, "bytes", &other)),
        },
        Step::UintBytes => {
            let n = to_unsigned(step, value)?;
            Ok(Value::Bytes(n.to_bytes_be()))
        }
        Step::Uint(width) => {
            let n = to_unsigned(step, value)?;
            ensure_fits(&n, width)?;
            Ok(Value::Uint(n))
        }
        Step::UintFixedBytes(width) => {
            let n = to_unsigned(step, value)?;
            ensure_fits(&n, width)?;
            Ok(Value::Bytes(fixed_be_bytes(&n, width.bytes())))
        }
        Step::Modulo(width) => match value {
            Value::Uint(n) => Ok(Value::Uint(n % modulus(width))),
            Value::Integer(i) => Ok(Value::Uint(floor_mod(&i, width))),
            other => Err(unexpected(step, "integer", &other)),
        },
    }
}

/// Applies `steps` left to right.
pub fn apply_chain(steps: &[Step], value: Value) -> Result<Value, EncodingError> {
    steps.iter().try_fold(value, |acc, step| apply(*step, acc))
}

/// Decodes hex text with an optional `0x` prefix.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, EncodingError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if digits.len() % 2 != 0 {
        return Err(EncodingError::OddLengthHex(digits.len()));
    }
    hex::decode(digits).map_err(|e| EncodingError::InvalidHex(e.to_string()))
}

/// 2^bits for the given width.
pub fn modulus(width: Width) -> BigUint {
    BigUint::from(1u8) << width.bits()
}

/// Big-endian bytes of `n`, left padded to `len`. Caller guarantees fit.
pub(crate) fn fixed_be_bytes(n: &BigUint, len: usize) -> Vec<u8> {
    let raw = n.to_bytes_be();
    let mut out = vec![0u8; len.saturating_sub(raw.len())];
    out.extend_from_slice(&raw[raw.len().saturating_sub(len)..]);
    out
}

fn to_unsigned(step: Step, value: Value) -> Result<BigUint, EncodingError> {
    match value {
        Value::Uint(n) => Ok(n),
        Value::Integer(i) => i
            .to_biguint()
            .ok_or_else(|| EncodingError::NegativeInteger(i.to_string())),
        other => Err(unexpected(step, "integer", &other)),
    }
}

fn ensure_fits(n: &BigUint, width: Width) -> Result<(), EncodingError> {
    if n.bits() > width.bits() {
        return Err(EncodingError::WidthExceeded {
            bits: width.bits(),
            value: n.to_string(),
        });
    }
    Ok(())
}

fn floor_mod(i: &BigInt, width: Width) -> BigUint {
    let m = BigInt::from(modulus(width));
    let mut r = i % &m;
    if r.sign() == Sign::Minus {
        r += &m;
    }
    // r is in [0, m) here
    r.magnitude().clone()
}

fn unexpected(step: Step, expected: &'static str, found: &Value) -> EncodingError {
    EncodingError::UnexpectedKind {
        step: step.name(),
        expected,
        found: found.kind(),
    }
}
