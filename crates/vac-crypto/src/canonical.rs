//! Canonical serialization of record trees.
//!
//! Produces the exact bytes that are hashed and signed. The layout is compact
//! JSON with object keys sorted by code point and non-ASCII text written as
//! raw UTF-8:
//!
//! ```text
//! {"b":1,"a":{"z":null,"é":"ü"}}  →  {"a":{"z":null,"é":"ü"},"b":1}
//! ```
//!
//! # Invariants
//!
//! - Structurally equal trees produce byte-identical output regardless of the
//!   key order they were parsed or built with.
//! - Output is valid JSON that parses back to an equal tree.
//!
//! Integer literals keep their exact digits at any magnitude, so records that
//! differ only past `u64::MAX` never share canonical bytes. Floats are
//! written in the shortest round-trip form using the same layout
//! rules as the reference signer (`1e+16`, `1e-05`, `100.0`), so a record
//! holding floats signs to the same bytes on both implementations.

use serde_json::{Number, Value};

use crate::{
    digest::{ContentDigest, sha256},
    error::{CryptoError, Result},
};

/// Deterministic serialization of a record tree.
///
/// Only constructed by [`canonicalize`]; there is no way to wrap arbitrary
/// bytes, so holding a `CanonicalBytes` means the bytes came from a tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Raw canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty serialization. Never true for output of
    /// [`canonicalize`], which always emits at least one token.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 digest of the canonical bytes.
    pub fn digest(&self) -> ContentDigest {
        sha256(&self.0)
    }

    /// Consume and return the underlying buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Serialize a record tree to its canonical bytes.
pub fn canonicalize(value: &Value) -> CanonicalBytes {
    let mut out = Vec::with_capacity(256);
    write_value(&mut out, value);
    CanonicalBytes(out)
}

/// Parse JSON text and serialize it canonically.
///
/// # Errors
///
/// - `CryptoError::InvalidRecord` if the text is not a single JSON value
pub fn canonicalize_str(text: &str) -> Result<CanonicalBytes> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| CryptoError::InvalidRecord { reason: e.to_string() })?;
    Ok(canonicalize(&value))
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(number) => write_number(out, number),
        Value::String(text) => write_string(out, text),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(out, item);
            }
            out.push(b']');
        },
        Value::Object(map) => {
            // UTF-8 byte order equals code point order
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(out, key);
                out.push(b':');
                write_value(out, item);
            }
            out.push(b'}');
        },
    }
}

fn write_string(out: &mut Vec<u8>, text: &str) {
    out.push(b'"');
    for ch in text.chars() {
        match ch {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            '\u{08}' => out.extend_from_slice(b"\\b"),
            '\u{0C}' => out.extend_from_slice(b"\\f"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            },
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            },
        }
    }
    out.push(b'"');
}

fn write_number(out: &mut Vec<u8>, number: &Number) {
    if number.is_f64() {
        if let Some(float) = number.as_f64() {
            write_float(out, float);
            return;
        }
    }

    // Integer literal as parsed (`arbitrary_precision`); `-0` is integer zero
    let literal = number.to_string();
    if literal == "-0" {
        out.push(b'0');
    } else {
        out.extend_from_slice(literal.as_bytes());
    }
}

/// Shortest round-trip float text with fixed notation for decimal exponents
/// in `-4..=15` and `d.ddde±XX` otherwise.
fn write_float(out: &mut Vec<u8>, float: f64) {
    if float.is_sign_negative() {
        out.push(b'-');
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.2345e-7"
    let sci = format!("{:e}", float.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    if (-4..16).contains(&exponent) {
        if exponent >= 0 {
            let int_len = (exponent + 1) as usize;
            if digits.len() <= int_len {
                out.extend_from_slice(digits.as_bytes());
                out.extend(std::iter::repeat_n(b'0', int_len - digits.len()));
                out.extend_from_slice(b".0");
            } else {
                out.extend_from_slice(digits[..int_len].as_bytes());
                out.push(b'.');
                out.extend_from_slice(digits[int_len..].as_bytes());
            }
        } else {
            out.extend_from_slice(b"0.");
            out.extend(std::iter::repeat_n(b'0', (-exponent - 1) as usize));
            out.extend_from_slice(digits.as_bytes());
        }
    } else {
        out.extend_from_slice(digits[..1].as_bytes());
        if digits.len() > 1 {
            out.push(b'.');
            out.extend_from_slice(digits[1..].as_bytes());
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        out.extend_from_slice(format!("e{sign}{:02}", exponent.unsigned_abs()).as_bytes());
    }
}
