// src/transform/step.rs
//! Encoding step identifiers.
//!
//! The set of steps is closed. New behaviour is added by adding a named
//! step here, never by coercing values on the fly.

use crate::error::EncodingError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Bit width of a width-parameterised step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    U16,
    U32,
    U64,
    U128,
    U256,
}

impl Width {
    pub fn bits(self) -> u64 {
        match self {
            Width::U16 => 16,
            Width::U32 => 32,
            Width::U64 => 64,
            Width::U128 => 128,
            Width::U256 => 256,
        }
    }

    pub fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }

    fn parse(digits: &str) -> Option<Self> {
        match digits {
            "16" => Some(Width::U16),
            "32" => Some(Width::U32),
            "64" => Some(Width::U64),
            "128" => Some(Width::U128),
            "256" => Some(Width::U256),
            _ => None,
        }
    }
}

/// One named encoding operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// `utf8-bytes`
    Utf8Bytes,
    /// `hex-bytes`, optional `0x` prefix
    HexBytes,
    /// `bytes-uint`, big-endian
    BytesUint,
    /// `bytes-uint<N>`: big-endian integer reduced mod 2^N
    BytesUintMod(Width),
    /// `uint-bytes`: minimal big-endian bytes
    UintBytes,
    /// `uint<N>`: unsigned integer that must fit N bits
    Uint(Width),
    /// `uint<N>-bytes`: exactly N/8 big-endian bytes
    UintFixedBytes(Width),
    /// `mod.uint<N>` (alias `modulo-uint<N>`)
    Modulo(Width),
}

impl Step {
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Utf8Bytes => write!(f, "utf8-bytes"),
            Step::HexBytes => write!(f, "hex-bytes"),
            Step::BytesUint => write!(f, "bytes-uint"),
            Step::BytesUintMod(w) => write!(f, "bytes-uint{}", w.bits()),
            Step::UintBytes => write!(f, "uint-bytes"),
            Step::Uint(w) => write!(f, "uint{}", w.bits()),
            Step::UintFixedBytes(w) => write!(f, "uint{}-bytes", w.bits()),
            Step::Modulo(w) => write!(f, "mod.uint{}", w.bits()),
        }
    }
}

impl FromStr for Step {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || EncodingError::UnknownStep(s.to_string());
        match s {
            "utf8-bytes" => return Ok(Step::Utf8Bytes),
            "hex-bytes" => return Ok(Step::HexBytes),
            "bytes-uint" => return Ok(Step::BytesUint),
            "uint-bytes" => return Ok(Step::UintBytes),
            _ => {}
        }

        if let Some(rest) = s
            .strip_prefix("mod.uint")
            .or_else(|| s.strip_prefix("modulo-uint"))
        {
            return Width::parse(rest).map(Step::Modulo).ok_or_else(unknown);
        }
        if let Some(rest) = s.strip_prefix("bytes-uint") {
            return Width::parse(rest).map(Step::BytesUintMod).ok_or_else(unknown);
        }
        if let Some(rest) = s.strip_prefix("uint") {
            if let Some(digits) = rest.strip_suffix("-bytes") {
                return Width::parse(digits).map(Step::UintFixedBytes).ok_or_else(unknown);
            }
            return Width::parse(rest).map(Step::Uint).ok_or_else(unknown);
        }
        Err(unknown())
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
