// src/utils/serialization.rs
//! Serialization utilities.
//!
//! Provides:
//! - Base64 transport encoding for opaque proof blobs
//! - `0x`-prefixed hex rendering, also as a serde field adapter

use ethers::utils::hex;

/// Encodes a proof blob for transport.
pub fn encode_proof(proof: &[u8]) -> String {
    base64::encode(proof)
}

/// Decodes a base64 proof blob.
pub fn decode_proof(data: &str) -> Result<Vec<u8>, String> {
    base64::decode(data).map_err(|e| format!("Base64 decoding failed: {}", e))
}

/// Lowercase hex with a `0x` prefix.
pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Serde adapter for `Vec<u8>` fields carried as `0x` hex strings.
///
/// Use with `#[serde(with = "crate::utils::serialization::hex_bytes")]`.
pub mod hex_bytes {
    use crate::transform::encoder::decode_hex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_hex_prefixed(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[test]
    fn test_proof_encoding_round_trip() {
        let blob = vec![0u8, 1, 2, 254, 255];
        assert_eq!(decode_proof(&encode_proof(&blob)).unwrap(), blob);
        assert!(decode_proof("not base64!").is_err());
    }

    #[test]
    fn test_hex_prefixed() {
        assert_eq!(to_hex_prefixed(&[0x03, 0x48]), "0x0348");
        assert_eq!(to_hex_prefixed(&[]), "0x");
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Wrapped {
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    }

    #[test]
    fn test_hex_bytes_adapter() {
        let wrapped = Wrapped { data: vec![0, 0xff] };
        let json = serde_json::to_string(&wrapped).unwrap();
        assert_eq!(json, r#"{"data":"0x00ff"}"#);
        assert_eq!(serde_json::from_str::<Wrapped>(&json).unwrap(), wrapped);
        assert!(serde_json::from_str::<Wrapped>(r#"{"data":"0x0"}"#).is_err());
    }
}
