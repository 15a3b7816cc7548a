use crate::error::Error;
use crate::knox::Knox;
use crate::CredxResult;
use blsful::inner_types::Scalar;
use lazy_static::lazy_static;
use log::{debug, log_enabled, Level};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// The top bit of a u64 used to shift signed numbers to an unsigned range
pub const TOP_BIT: u64 = i64::MIN as u64;

const ENCODED_ATTRIBUTE_DST: &[u8] = b"credx encoded attribute";

lazy_static! {
    static ref LEADING_ZEROS: Regex = Regex::new("^0*").expect("static regex");
}

/// Boundary validation for structured payloads
pub trait Validatable {
    /// Check the invariants of this value
    fn validate(&self) -> CredxResult<()> {
        Ok(())
    }
}

/// Map a number to the scalar used for signing
pub fn get_num_scalar(num: i64) -> Scalar {
    Scalar::from(zero_center(num))
}

/// Shift a signed number so that ordering is preserved as unsigned
pub fn zero_center(num: i64) -> u64 {
    num as u64 ^ TOP_BIT
}

/// The canonical form of an attribute name used for lookups and ordering
pub fn attr_common_view(attr: &str) -> String {
    attr.replace(' ', "").to_lowercase()
}

/// Strip leading zeros from an encoded value before comparisons
pub fn strip_leading_zeros(encoded: &str) -> String {
    LEADING_ZEROS.replace_all(encoded, "").into_owned()
}

/// Encode a raw attribute value as a decimal string.
///
/// Values that parse as 32-bit integers are kept in canonical decimal form
/// so that predicates can be proven over them, everything else is hashed.
pub fn encode_credential_attribute(raw: &str) -> String {
    if let Ok(n) = raw.parse::<i32>() {
        return n.to_string();
    }
    let digest = Sha256::digest(raw.as_bytes());
    be_bytes_to_decimal(digest.as_slice())
}

/// Convert an encoded attribute to the scalar signed by the issuer.
///
/// Decimals in the `i64` range map to their zero centered number, larger
/// ones are hashed so no two distinct decimals share a scalar.
pub fn encoded_to_scalar(encoded: &str) -> CredxResult<Scalar> {
    let digits = encoded.strip_prefix('-').unwrap_or(encoded);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidClaimData(format!(
            "encoded value `{}` is not a decimal number",
            encoded
        )));
    }
    match encoded.parse::<i64>() {
        Ok(n) => Ok(get_num_scalar(n)),
        Err(_) if digits.len() != encoded.len() => Err(Error::InvalidClaimData(format!(
            "encoded value `{}` is below the signed 64-bit range",
            encoded
        ))),
        Err(_) => Ok(Knox::hash_to_scalar(
            ENCODED_ATTRIBUTE_DST,
            strip_leading_zeros(encoded).as_bytes(),
        )),
    }
}

/// Parse an encoded attribute as a number usable in predicates
pub fn encoded_to_number(encoded: &str) -> Option<i64> {
    encoded.parse::<i64>().ok()
}

fn be_bytes_to_decimal(bytes: &[u8]) -> String {
    let mut num = bytes.to_vec();
    let mut digits = Vec::new();
    while num.iter().any(|b| *b != 0) {
        let mut rem = 0u32;
        for b in num.iter_mut() {
            let acc = (rem << 8) | u32::from(*b);
            *b = (acc / 10) as u8;
            rem = acc % 10;
        }
        digits.push(char::from(b'0' + rem as u8));
    }
    if digits.is_empty() {
        return "0".to_string();
    }
    digits.iter().rev().collect()
}

/// Log a produced artifact as pretty JSON
pub(crate) fn log_artifact<T: Serialize>(label: &str, value: &T) {
    if log_enabled!(Level::Debug) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => debug!("{}: {}", label, json),
            Err(e) => debug!("{}: unrenderable ({})", label, e),
        }
    }
}

/// Hex encoded SHA-256 digest
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
