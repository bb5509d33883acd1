// src/transform/passport.rs
//! Built-in schemas for passport credentials.
//!
//! `PASSPORT_SIGN_SCHEMA` produces the bytes the issuer hashes and signs;
//! `PASSPORT_ZK_SCHEMA` produces the integers handed to the circuit. Both
//! visit the same fields in the same order. The document id precedes the
//! document type in both, matching the circuit ABI and the deployed issuer.

use crate::transform::schema::Schema;
use crate::transform::step::{Step, Width};
use once_cell::sync::Lazy;

/// Canonical byte layout under [`PASSPORT_SIGN_SCHEMA`], in emission order.
/// The 64-byte issuer key is split into its two coordinates.
pub const PASSPORT_LAYOUT: [(&str, usize); 12] = [
    ("isr_id_t", 2),
    ("isr_id_k_x", 32),
    ("isr_id_k_y", 32),
    ("sch", 2),
    ("isd", 8),
    ("exd", 8),
    ("sbj_id_t", 2),
    ("sbj_id_k", 20),
    ("sbj_bd", 8),
    ("sbj_cc", 2),
    ("sbj_doc_id", 32),
    ("sbj_doc_t", 2),
];

/// Total length of a canonical passport credential.
pub const PASSPORT_CANONICAL_LEN: usize = 150;

pub static PASSPORT_SIGN_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let u16b = Step::UintFixedBytes(Width::U16);
    let u64b = Step::UintFixedBytes(Width::U64);
    let id = || Schema::new().leaf("t", [u16b]).leaf("k", [Step::HexBytes]);

    Schema::new()
        .branch("isr", Schema::new().branch("id", id()))
        .leaf("sch", [u16b])
        .leaf("isd", [u64b])
        .leaf("exd", [u64b])
        .branch(
            "sbj",
            Schema::new()
                .branch("id", id())
                .leaf("bd", [u64b])
                .leaf("cc", [u16b])
                .branch(
                    "doc",
                    Schema::new()
                        .leaf(
                            "id",
                            [
                                Step::Utf8Bytes,
                                Step::BytesUintMod(Width::U256),
                                Step::UintFixedBytes(Width::U256),
                            ],
                        )
                        .leaf("t", [u16b]),
                ),
        )
});

pub static PASSPORT_ZK_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let uint16 = Step::Uint(Width::U16);
    let uint64 = Step::Uint(Width::U64);
    let id = || Schema::new().leaf("t", [uint16]).leaf("k", [Step::HexBytes, Step::BytesUint]);

    Schema::new()
        .branch("isr", Schema::new().branch("id", id()))
        .leaf("sch", [uint16])
        .leaf("isd", [uint64])
        .leaf("exd", [uint64])
        .branch(
            "sbj",
            Schema::new()
                .branch("id", id())
                .leaf("bd", [uint64])
                .leaf("cc", [uint16])
                .branch(
                    "doc",
                    Schema::new()
                        .leaf("id", [Step::Utf8Bytes, Step::BytesUintMod(Width::U256)])
                        .leaf("t", [uint16]),
                ),
        )
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_visit_the_same_fields() {
        let expected = vec![
            "isr.id.t", "isr.id.k", "sch", "isd", "exd", "sbj.id.t", "sbj.id.k", "sbj.bd", "sbj.cc",
            "sbj.doc.id", "sbj.doc.t",
        ];
        assert_eq!(PASSPORT_SIGN_SCHEMA.leaf_paths(), expected);
        assert_eq!(PASSPORT_ZK_SCHEMA.leaf_paths(), expected);
    }

    #[test]
    fn test_layout_total() {
        let total: usize = PASSPORT_LAYOUT.iter().map(|(_, len)| len).sum();
        assert_eq!(total, PASSPORT_CANONICAL_LEN);
    }

    #[test]
    fn test_sign_schema_json_form() {
        let json = PASSPORT_SIGN_SCHEMA.to_json();
        assert_eq!(json["sbj"]["doc"]["id"][2], "uint256-bytes");
        assert_eq!(Schema::from_json(&json).unwrap(), *PASSPORT_SIGN_SCHEMA);
    }
}
