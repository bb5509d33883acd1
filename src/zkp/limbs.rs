// src/zkp/limbs.rs
//! Fixed-width packing of field values for the circuit ABI.
//!
//! A packed value is exactly N big-endian bytes: shorter inputs are
//! left-padded with zeros, longer inputs keep their last N bytes. The
//! buffer is exposed as 16-byte limbs, most significant first, each
//! rendered as a 32-byte `0x` hex word.
//!
//! # Known risk
//! Oversized inputs are truncated, not rejected. Truncation is the same as
//! reduction modulo 2^(8N), so high-order magnitude is silently lost; a
//! warning is logged whenever non-zero bytes are dropped.

use crate::error::EncodingError;
use crate::transform::encoder::decode_hex;
use crate::transform::value::Value;
use ethers::utils::hex;
use log::warn;
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

/// Bytes per limb.
pub const LIMB_BYTES: usize = 16;

/// ABI form of a packed value: `{ "v": ["0x…", …] }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LimbAbi {
    pub v: Vec<String>,
}

/// Left-pads or truncates `bytes` to exactly `width` bytes.
fn fit(bytes: &[u8], width: usize) -> Vec<u8> {
    if bytes.len() <= width {
        let mut out = vec![0u8; width - bytes.len()];
        out.extend_from_slice(bytes);
        return out;
    }
    let cut = bytes.len() - width;
    if bytes[..cut].iter().any(|b| *b != 0) {
        warn!(
            "packing {} bytes into {}: dropping {} high-order bytes",
            bytes.len(),
            width,
            cut
        );
    }
    bytes[cut..].to_vec()
}

fn limbs_of(bytes: &[u8]) -> Vec<u128> {
    bytes
        .chunks(LIMB_BYTES)
        .map(|chunk| chunk.iter().fold(0u128, |acc, b| (acc << 8) | u128::from(*b)))
        .collect()
}

fn abi_of(bytes: &[u8]) -> LimbAbi {
    LimbAbi {
        v: limbs_of(bytes).into_iter().map(|limb| format!("0x{:064x}", limb)).collect(),
    }
}

fn value_bytes(value: &Value) -> Result<Vec<u8>, EncodingError> {
    match value {
        Value::Bytes(bytes) => Ok(bytes.clone()),
        Value::Uint(n) => Ok(n.to_bytes_be()),
        Value::Integer(n) => int_bytes(n),
        Value::Text(_) => Err(EncodingError::UnexpectedKind {
            step: "pack".into(),
            expected: "bytes or integer",
            found: value.kind(),
        }),
    }
}

fn int_bytes(n: &BigInt) -> Result<Vec<u8>, EncodingError> {
    n.to_biguint()
        .map(|u| u.to_bytes_be())
        .ok_or_else(|| EncodingError::NegativeInteger(n.to_string()))
}

/// A value packed into a runtime-chosen width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedField {
    bytes: Vec<u8>,
}

impl PackedField {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> usize {
        self.bytes.len()
    }

    /// `ceil(width / 16)` limbs, most significant first.
    pub fn limbs(&self) -> Vec<u128> {
        limbs_of(&self.bytes)
    }

    pub fn to_uint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.bytes)
    }

    pub fn to_zk_abi(&self) -> LimbAbi {
        abi_of(&self.bytes)
    }
}

/// Packs a byte buffer or non-negative integer into `width_bytes` bytes.
///
/// # Arguments
/// * `value` - Bytes, an unsigned integer or a non-negative signed integer
/// * `width_bytes` - Target width in bytes
///
/// # Returns
/// The packed field, or `EncodingError::NegativeInteger` for negative input
pub fn pack(value: &Value, width_bytes: usize) -> Result<PackedField, EncodingError> {
    let bytes = value_bytes(value)?;
    Ok(PackedField { bytes: fit(&bytes, width_bytes) })
}

/// Compile-time width variant of [`PackedField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedUint<const N: usize> {
    bytes: [u8; N],
}

pub type Uint256 = FixedUint<32>;
pub type Uint512 = FixedUint<64>;

impl<const N: usize> FixedUint<N> {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut out = [0u8; N];
        out.copy_from_slice(&fit(bytes, N));
        FixedUint { bytes: out }
    }

    pub fn from_uint(value: &BigUint) -> Self {
        Self::from_bytes(&value.to_bytes_be())
    }

    pub fn from_int(value: &BigInt) -> Result<Self, EncodingError> {
        int_bytes(value).map(|bytes| Self::from_bytes(&bytes))
    }

    pub fn from_hex(value: &str) -> Result<Self, EncodingError> {
        decode_hex(value).map(|bytes| Self::from_bytes(&bytes))
    }

    pub fn from_value(value: &Value) -> Result<Self, EncodingError> {
        value_bytes(value).map(|bytes| Self::from_bytes(&bytes))
    }

    /// Rebuilds a value from its ABI limbs.
    pub fn from_abi(abi: &LimbAbi) -> Result<Self, EncodingError> {
        let expected = (N + LIMB_BYTES - 1) / LIMB_BYTES;
        if abi.v.len() != expected {
            return Err(EncodingError::InvalidLimb(format!(
                "expected {} limbs, got {}",
                expected,
                abi.v.len()
            )));
        }

        let mut bytes = Vec::with_capacity(expected * LIMB_BYTES);
        for limb in &abi.v {
            let digits = limb.strip_prefix("0x").unwrap_or(limb);
            let word = BigUint::parse_bytes(digits.as_bytes(), 16)
                .map(|n| n.to_bytes_be())
                .filter(|b| b.len() <= LIMB_BYTES)
                .ok_or_else(|| EncodingError::InvalidLimb(limb.clone()))?;
            bytes.extend_from_slice(&fit(&word, LIMB_BYTES));
        }
        // limbs are full 16-byte words; the leading bytes of a short final word are padding
        let extra = bytes.len() - N;
        if bytes[..extra].iter().any(|b| *b != 0) {
            return Err(EncodingError::InvalidLimb(format!("value exceeds {} bytes", N)));
        }
        Ok(Self::from_bytes(&bytes[extra..]))
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn limbs(&self) -> Vec<u128> {
        limbs_of(&self.bytes)
    }

    pub fn to_uint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.bytes)
    }

    pub fn to_zk_abi(&self) -> LimbAbi {
        abi_of(&self.bytes)
    }
}

/// `0x` followed by exactly `2 * width` hex digits, zero padded on the left.
pub fn hex_zero_pad(bytes: &[u8], width: usize) -> Result<String, EncodingError> {
    if bytes.len() > width {
        return Err(EncodingError::WidthExceeded {
            bits: (width as u64) * 8,
            value: format!("0x{}", hex::encode(bytes)),
        });
    }
    Ok(format!("0x{}{}", "00".repeat(width - bytes.len()), hex::encode(bytes)))
}
