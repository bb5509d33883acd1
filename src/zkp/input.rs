// src/zkp/input.rs
//! Circuit input construction.
//!
//! Two views of the same credential are produced here:
//! - [`ZkInput`]: integer fields and packed limbs, walked with
//!   `PASSPORT_ZK_SCHEMA`
//! - [`ByteZkInput`]: the canonical signed bytes cut into fields with the
//!   sequential slicer
//!
//! Both follow the field order of `PASSPORT_SIGN_SCHEMA`, so the circuit
//! sees exactly the data the issuer hashed.

use crate::error::{BufferExhaustedError, EncodingError, SchemaMismatchError, TransformError};
use crate::models::credential::{PassportCredential, ID_ETH_ADDRESS};
use crate::transform::encoder::{apply_chain, decode_hex};
use crate::transform::passport::{PASSPORT_LAYOUT, PASSPORT_ZK_SCHEMA};
use crate::transform::step::{Step, Width};
use crate::transform::value::Value;
use crate::transform::walker::{prepare_named, Prepared};
use crate::utils::slicer::ByteSlicer;
use crate::wallet::key_management::CredentialSignature;
use crate::zkp::limbs::{hex_zero_pad, LimbAbi, Uint256, Uint512};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Steps applied to the optional first/last name before packing.
const NAME_STEPS: [Step; 3] = [Step::Utf8Bytes, Step::BytesUint, Step::Modulo(Width::U128)];

/// Credential fields as the circuit ABI names them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ZkCred {
    pub isr_id_t: u16,
    pub isr_id_k: LimbAbi,
    pub sch: u16,
    pub isd: u64,
    pub exd: u64,
    pub sbj_id_t: u16,
    /// Subject address as a 32-byte `0x` word.
    pub sbj_id_k: String,
    pub sbj_bd: u64,
    pub sbj_cc: u16,
    pub sbj_doc_id: LimbAbi,
    pub sbj_doc_t: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbj_fn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbj_ln: Option<String>,
}

/// Full circuit input: public statement plus private credential.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ZkInput {
    pub issuer_id: LimbAbi,
    pub subject_address: String,
    /// Milliseconds since the Unix epoch.
    pub current_date: i64,
    pub sign: LimbAbi,
    pub cred: ZkCred,
}

fn encoding(path: &str, source: EncodingError) -> TransformError {
    TransformError::Encoding { path: path.to_string(), source }
}

fn field<'a>(prepared: &'a Prepared, path: &str) -> Result<&'a Value, TransformError> {
    prepared
        .get(path)
        .ok_or_else(|| SchemaMismatchError::MissingField { path: path.to_string() }.into())
}

fn uint_at<'a>(prepared: &'a Prepared, path: &str) -> Result<&'a BigUint, TransformError> {
    let value = field(prepared, path)?;
    value.as_uint().ok_or_else(|| {
        encoding(
            path,
            EncodingError::UnexpectedKind {
                step: "zk-input".into(),
                expected: "integer",
                found: value.kind(),
            },
        )
    })
}

fn narrow<T>(prepared: &Prepared, path: &str) -> Result<T, TransformError>
where
    T: for<'a> TryFrom<&'a BigUint>,
{
    let n = uint_at(prepared, path)?;
    T::try_from(n).map_err(|_| {
        encoding(
            path,
            EncodingError::WidthExceeded {
                bits: (std::mem::size_of::<T>() * 8) as u64,
                value: n.to_string(),
            },
        )
    })
}

fn packed_name(name: Option<&str>, path: &str) -> Result<Option<String>, TransformError> {
    let Some(name) = name else { return Ok(None) };
    let value = apply_chain(&NAME_STEPS, Value::Text(name.to_string())).map_err(|e| encoding(path, e))?;
    let bytes = value.as_uint().map(BigUint::to_bytes_be).unwrap_or_default();
    hex_zero_pad(&bytes, 32).map(Some).map_err(|e| encoding(path, e))
}

/// Builds the circuit input for `credential` signed with `signature`.
///
/// # Arguments
/// * `credential` - The issued credential
/// * `signature` - Issuer signature over its canonical bytes
/// * `current_date` - Proof time in milliseconds since the Unix epoch
///
/// # Returns
/// The ABI object, or the first field that could not be encoded
pub fn build_zk_input(
    credential: &PassportCredential,
    signature: &CredentialSignature,
    current_date: i64,
) -> Result<ZkInput, TransformError> {
    let prepared = prepare_named(&credential.to_record(), &PASSPORT_ZK_SCHEMA)?;

    let isr_id_k = Uint512::from_value(field(&prepared, "isr.id.k")?)
        .map_err(|e| encoding("isr.id.k", e))?
        .to_zk_abi();
    let subject = uint_at(&prepared, "sbj.id.k")?.to_bytes_be();
    let sbj_id_k = hex_zero_pad(&subject, 32).map_err(|e| encoding("sbj.id.k", e))?;
    let sbj_doc_id = Uint256::from_value(field(&prepared, "sbj.doc.id")?)
        .map_err(|e| encoding("sbj.doc.id", e))?
        .to_zk_abi();

    let cred = ZkCred {
        isr_id_t: narrow(&prepared, "isr.id.t")?,
        isr_id_k: isr_id_k.clone(),
        sch: narrow(&prepared, "sch")?,
        isd: narrow(&prepared, "isd")?,
        exd: narrow(&prepared, "exd")?,
        sbj_id_t: narrow(&prepared, "sbj.id.t")?,
        sbj_id_k: sbj_id_k.clone(),
        sbj_bd: narrow(&prepared, "sbj.bd")?,
        sbj_cc: narrow(&prepared, "sbj.cc")?,
        sbj_doc_id,
        sbj_doc_t: narrow(&prepared, "sbj.doc.t")?,
        sbj_fn: packed_name(credential.sbj.first_name.as_deref(), "sbj.fn")?,
        sbj_ln: packed_name(credential.sbj.last_name.as_deref(), "sbj.ln")?,
    };

    Ok(ZkInput {
        issuer_id: isr_id_k,
        subject_address: sbj_id_k,
        current_date,
        sign: Uint512::from_bytes(signature.compact()).to_zk_abi(),
        cred,
    })
}

/// Re-derives the canonical signed bytes from circuit fields.
///
/// Only address subjects (`t = 2`) have a fixed key width in the canonical
/// layout; other subject types are rejected.
pub fn canonical_bytes_from_input(input: &ZkInput) -> Result<Vec<u8>, EncodingError> {
    let cred = &input.cred;
    if cred.sbj_id_t != ID_ETH_ADDRESS {
        return Err(EncodingError::InvalidLimb(format!(
            "subject id type {} has no fixed canonical width",
            cred.sbj_id_t
        )));
    }
    let address_word = decode_hex(&cred.sbj_id_k)?;
    if address_word.len() != 32 || address_word[..12].iter().any(|b| *b != 0) {
        return Err(EncodingError::InvalidLimb(cred.sbj_id_k.clone()));
    }

    let mut out = Vec::with_capacity(crate::transform::passport::PASSPORT_CANONICAL_LEN);
    out.extend_from_slice(&cred.isr_id_t.to_be_bytes());
    out.extend_from_slice(Uint512::from_abi(&cred.isr_id_k)?.as_bytes());
    out.extend_from_slice(&cred.sch.to_be_bytes());
    out.extend_from_slice(&cred.isd.to_be_bytes());
    out.extend_from_slice(&cred.exd.to_be_bytes());
    out.extend_from_slice(&cred.sbj_id_t.to_be_bytes());
    out.extend_from_slice(&address_word[12..]);
    out.extend_from_slice(&cred.sbj_bd.to_be_bytes());
    out.extend_from_slice(&cred.sbj_cc.to_be_bytes());
    out.extend_from_slice(Uint256::from_abi(&cred.sbj_doc_id)?.as_bytes());
    out.extend_from_slice(&cred.sbj_doc_t.to_be_bytes());
    Ok(out)
}

/// Canonical bytes cut into named fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialBytes {
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub isr_id_t: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub isr_id_k_x: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub isr_id_k_y: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub sch: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub isd: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub exd: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub sbj_id_t: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub sbj_id_k: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub sbj_bd: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub sbj_cc: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub sbj_doc_id: Vec<u8>,
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub sbj_doc_t: Vec<u8>,
}

/// Byte-level circuit input.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ByteZkInput {
    #[serde(with = "crate::utils::serialization::hex_bytes")]
    pub signature: Vec<u8>,
    pub cred: CredentialBytes,
}

impl ByteZkInput {
    /// Slices `canonical` along `PASSPORT_LAYOUT`. Trailing bytes are ignored.
    pub fn from_canonical(
        canonical: &[u8],
        signature: &CredentialSignature,
    ) -> Result<Self, BufferExhaustedError> {
        let mut slicer = ByteSlicer::new(canonical);
        let mut take = |i: usize| slicer.slice(PASSPORT_LAYOUT[i].1).map(<[u8]>::to_vec);

        let cred = CredentialBytes {
            isr_id_t: take(0)?,
            isr_id_k_x: take(1)?,
            isr_id_k_y: take(2)?,
            sch: take(3)?,
            isd: take(4)?,
            exd: take(5)?,
            sbj_id_t: take(6)?,
            sbj_id_k: take(7)?,
            sbj_bd: take(8)?,
            sbj_cc: take(9)?,
            sbj_doc_id: take(10)?,
            sbj_doc_t: take(11)?,
        };
        Ok(ByteZkInput { signature: signature.compact().to_vec(), cred })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::tests::fixture_credential;
    use crate::transform::canonical::canonicalize;
    use crate::transform::passport::PASSPORT_SIGN_SCHEMA;
    use crate::wallet::key_management::tests::{FIXTURE_CANONICAL, FIXTURE_SIGNATURE};
    use ethers::utils::hex;
    use serde_json::json;

    fn fixture_signature() -> CredentialSignature {
        CredentialSignature::from_hex(FIXTURE_SIGNATURE).unwrap()
    }

    #[test]
    fn test_zk_input_matches_circuit_fixture() {
        let input = build_zk_input(&fixture_credential(), &fixture_signature(), 1_700_000_000_000).unwrap();
        let expected = json!({
            "sign": { "v": [
                "0x0000000000000000000000000000000003482f78d9c7172627187ca6b4543194",
                "0x00000000000000000000000000000000d86fe568ce566def1403ae722377db0e",
                "0x0000000000000000000000000000000060b98540c3279bd4c13f8c17ac7fb1fb",
                "0x00000000000000000000000000000000f6b55f22bc50d403291fe46bdffc1fd8"
            ]},
            "cred": {
                "isr_id_t": 1,
                "isr_id_k": { "v": [
                    "0x00000000000000000000000000000000695dad8d0d6ca804ffad3c1809c32bcf",
                    "0x0000000000000000000000000000000031b3cef11e1618f28df7af6716a42bea",
                    "0x00000000000000000000000000000000a18e3aee6fec3afd219bb6853a834b72",
                    "0x00000000000000000000000000000000f234335a17c6519c7e0eaca9f29c0a97"
                ]},
                "sch": 2,
                "isd": 1696790497147u64,
                "exd": 0,
                "sbj_id_t": 2,
                "sbj_id_k": "0x0000000000000000000000009ebd816fa99ce2101091203abd135fd08ce7c8ab",
                "sbj_bd": 3158350217000u64,
                "sbj_cc": 840,
                "sbj_doc_id": { "v": [
                    "0x0000000000000000000000000000000000000000000000000000000000000000",
                    "0x000000000000000000000000000000000000000000000000493132333132334b"
                ]},
                "sbj_doc_t": 1
            }
        });

        let actual = serde_json::to_value(&input).unwrap();
        assert_eq!(actual["sign"], expected["sign"]);
        assert_eq!(actual["cred"], expected["cred"]);
        assert_eq!(input.issuer_id, input.cred.isr_id_k);
        assert_eq!(input.subject_address, input.cred.sbj_id_k);
        assert_eq!(input.current_date, 1_700_000_000_000);
    }

    #[test]
    fn test_names_are_packed_when_present() {
        let mut credential = fixture_credential();
        credential.sbj.first_name = Some("JOHN".into());
        let input = build_zk_input(&credential, &fixture_signature(), 0).unwrap();
        assert_eq!(
            input.cred.sbj_fn.as_deref(),
            Some("0x000000000000000000000000000000000000000000000000000000004a4f484e")
        );
        assert_eq!(input.cred.sbj_ln, None);
    }

    #[test]
    fn test_negative_timestamp_is_an_encoding_error() {
        let mut credential = fixture_credential();
        credential.sbj.bd = -1;
        match build_zk_input(&credential, &fixture_signature(), 0) {
            Err(TransformError::Encoding { path, source: EncodingError::NegativeInteger(_) }) => {
                assert_eq!(path, "sbj.bd")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_canonical_bytes_from_input_agree_with_signed_bytes() {
        let credential = fixture_credential();
        let input = build_zk_input(&credential, &fixture_signature(), 0).unwrap();
        let rebuilt = canonical_bytes_from_input(&input).unwrap();
        assert_eq!(rebuilt, canonicalize(&credential.to_record(), &PASSPORT_SIGN_SCHEMA).unwrap());
        assert_eq!(hex::encode(rebuilt), FIXTURE_CANONICAL);
    }

    #[test]
    fn test_byte_input_slices_canonical_buffer() {
        let canonical = hex::decode(FIXTURE_CANONICAL).unwrap();
        let input = ByteZkInput::from_canonical(&canonical, &fixture_signature()).unwrap();
        assert_eq!(input.cred.isr_id_t, vec![0, 1]);
        assert_eq!(hex::encode(&input.cred.isr_id_k_x), &crate::models::credential::tests::FIXTURE_ISSUER_KEY[..64]);
        assert_eq!(hex::encode(&input.cred.sbj_id_k), "9ebd816fa99ce2101091203abd135fd08ce7c8ab");
        assert_eq!(input.cred.sbj_doc_t, vec![0, 1]);
        assert_eq!(input.signature.len(), 64);

        let err = ByteZkInput::from_canonical(&canonical[..100], &fixture_signature()).unwrap_err();
        assert_eq!(err.len, 100);
    }
}
