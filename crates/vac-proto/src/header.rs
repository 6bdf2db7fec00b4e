//! Protected and unprotected header model.
//!
//! The protected header is signed: its exact encoded bytes are part of the
//! `Sig_structure`. The unprotected header is informational and can be
//! rewritten by anyone holding the envelope without affecting the signature.
//!
//! ```text
//! protected   = bstr .cbor { 1: -8, 3: "application/json", 15: { 1: iss, 2: sub } }
//! unprotected = { 100: { "session-id": tstr, "agent-vendor": tstr, ... } }
//! ```
//!
//! Decoding is lenient about what is absent and strict about what is
//! present: missing optional entries decode as `None`, while an entry of the
//! wrong CBOR type is a [`ProtocolError::InvalidHeader`]. Unknown labels and
//! unknown metadata keys are ignored.

use std::fmt;

use ciborium::value::{Integer, Value};
use serde::Serialize;

use crate::{
    errors::{ProtocolError, Result},
    labels::{Algorithm, CONTENT_TYPE_JSON, ClaimLabel, HeaderLabel, trace},
};

/// Issuer and subject asserted at signing time.
///
/// Carried in the protected header, so a verified signature vouches for both
/// values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CwtClaims {
    /// Who asserted the record (`iss`, label 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// What the record is about (`sub`, label 2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl CwtClaims {
    /// Claims with both fields set.
    pub fn new(issuer: impl Into<String>, subject: impl Into<String>) -> Self {
        Self { issuer: Some(issuer.into()), subject: Some(subject.into()) }
    }

    fn to_cbor(&self) -> Value {
        let mut entries = Vec::with_capacity(2);
        if let Some(issuer) = &self.issuer {
            entries.push((int(ClaimLabel::Issuer.to_i64()), Value::Text(issuer.clone())));
        }
        if let Some(subject) = &self.subject {
            entries.push((int(ClaimLabel::Subject.to_i64()), Value::Text(subject.clone())));
        }
        Value::Map(entries)
    }

    fn from_cbor(value: &Value) -> Result<Self> {
        let Value::Map(entries) = value else {
            return Err(ProtocolError::InvalidHeader("CWT claims is not a map".to_string()));
        };

        let mut claims = Self::default();
        let mut seen = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let Some(label) = int_label(key) else { continue };
            reject_duplicate(&mut seen, label, "CWT claims")?;

            match ClaimLabel::from_i64(label) {
                Some(ClaimLabel::Issuer) => claims.issuer = Some(text(value, "issuer")?),
                Some(ClaimLabel::Subject) => claims.subject = Some(text(value, "subject")?),
                None => {},
            }
        }
        Ok(claims)
    }
}

/// An abstract timestamp: RFC 3339 text or a number of seconds since the
/// Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// RFC 3339 text, e.g. `2024-01-01T00:00:00Z`
    Text(String),
    /// Whole seconds since the epoch
    Integer(i64),
    /// Fractional seconds since the epoch
    Float(f64),
}

impl Timestamp {
    fn to_cbor(&self) -> Value {
        match self {
            Self::Text(text) => Value::Text(text.clone()),
            Self::Integer(secs) => int(*secs),
            Self::Float(secs) => Value::Float(*secs),
        }
    }

    fn from_cbor(value: &Value, field: &str) -> Result<Self> {
        match value {
            Value::Text(text) => Ok(Self::Text(text.clone())),
            Value::Integer(secs) => i64::try_from(*secs).map(Self::Integer).map_err(|_| {
                ProtocolError::InvalidHeader(format!("{field} is out of range"))
            }),
            Value::Float(secs) => Ok(Self::Float(*secs)),
            _ => Err(ProtocolError::InvalidHeader(format!("{field} is not a timestamp"))),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(secs) => write!(f, "{secs}"),
            Self::Float(secs) => write!(f, "{secs}"),
        }
    }
}

/// Descriptive provenance fields carried in the unprotected header.
///
/// Not covered by the signature. Every field is optional on the wire; the
/// signer always fills all of them except `timestamp_end`, which is omitted
/// when the record has no end time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TraceMetadata {
    /// `session-id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// `agent-vendor`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_vendor: Option<String>,
    /// `trace-format`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_format: Option<String>,
    /// `content-hash`, lowercase hex
    ///
    /// A non-text value is a malformed header and fails decoding; only
    /// well-formed hash text is compared against the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// `content-hash-alg`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash_alg: Option<String>,
    /// `timestamp-start`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_start: Option<Timestamp>,
    /// `timestamp-end`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_end: Option<Timestamp>,
}

impl TraceMetadata {
    fn to_cbor(&self) -> Value {
        let text_fields = [
            (trace::SESSION_ID, &self.session_id),
            (trace::AGENT_VENDOR, &self.agent_vendor),
            (trace::TRACE_FORMAT, &self.trace_format),
            (trace::CONTENT_HASH, &self.content_hash),
            (trace::CONTENT_HASH_ALG, &self.content_hash_alg),
        ];

        let mut entries = Vec::with_capacity(7);
        for (key, value) in text_fields {
            if let Some(value) = value {
                entries.push((Value::Text(key.to_string()), Value::Text(value.clone())));
            }
        }
        if let Some(start) = &self.timestamp_start {
            entries.push((Value::Text(trace::TIMESTAMP_START.to_string()), start.to_cbor()));
        }
        if let Some(end) = &self.timestamp_end {
            entries.push((Value::Text(trace::TIMESTAMP_END.to_string()), end.to_cbor()));
        }
        Value::Map(entries)
    }

    fn from_cbor(value: &Value) -> Result<Self> {
        let Value::Map(entries) = value else {
            return Err(ProtocolError::InvalidHeader("trace metadata is not a map".to_string()));
        };

        let mut meta = Self::default();
        for (key, value) in entries {
            let Value::Text(key) = key else { continue };
            match key.as_str() {
                trace::SESSION_ID => meta.session_id = Some(text(value, key)?),
                trace::AGENT_VENDOR => meta.agent_vendor = Some(text(value, key)?),
                trace::TRACE_FORMAT => meta.trace_format = Some(text(value, key)?),
                trace::CONTENT_HASH => meta.content_hash = Some(text(value, key)?),
                trace::CONTENT_HASH_ALG => meta.content_hash_alg = Some(text(value, key)?),
                trace::TIMESTAMP_START => {
                    meta.timestamp_start = Some(Timestamp::from_cbor(value, key)?);
                },
                trace::TIMESTAMP_END => {
                    meta.timestamp_end = Some(Timestamp::from_cbor(value, key)?);
                },
                _ => {},
            }
        }
        Ok(meta)
    }
}

/// Signed header parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedHeader {
    /// Signing algorithm (label 1)
    pub algorithm: Algorithm,
    /// Payload content type (label 3)
    pub content_type: Option<String>,
    /// Issuer/subject claims (label 15)
    pub cwt_claims: Option<CwtClaims>,
}

impl ProtectedHeader {
    /// EdDSA over a JSON payload with the given claims.
    pub fn eddsa_json(cwt_claims: CwtClaims) -> Self {
        Self {
            algorithm: Algorithm::EdDsa,
            content_type: Some(CONTENT_TYPE_JSON.to_string()),
            cwt_claims: Some(cwt_claims),
        }
    }

    /// Encode to the bytes placed in the protected slot.
    ///
    /// Entries are written in ascending label order, so equal headers always
    /// encode to equal bytes.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut entries = Vec::with_capacity(3);
        entries.push((int(HeaderLabel::Algorithm.to_i64()), int(self.algorithm.to_i64())));
        if let Some(content_type) = &self.content_type {
            let content_type = Value::Text(content_type.clone());
            entries.push((int(HeaderLabel::ContentType.to_i64()), content_type));
        }
        if let Some(claims) = &self.cwt_claims {
            entries.push((int(HeaderLabel::CwtClaims.to_i64()), claims.to_cbor()));
        }
        encode_value(&Value::Map(entries))
    }

    /// Decode the protected slot bytes.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` if the bytes are not one CBOR item
    /// - `ProtocolError::InvalidHeader` if the item is not a label map, a
    ///   label repeats, or a known entry has the wrong type
    /// - `ProtocolError::UnsupportedAlgorithm` for any algorithm but EdDSA
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(ProtocolError::InvalidHeader(
                "protected header is empty; algorithm is required".to_string(),
            ));
        }

        let Value::Map(entries) = decode_value(bytes)? else {
            return Err(ProtocolError::InvalidHeader("protected header is not a map".to_string()));
        };

        let mut algorithm = None;
        let mut content_type = None;
        let mut cwt_claims = None;
        let mut seen = Vec::with_capacity(entries.len());

        for (key, value) in &entries {
            let Some(label) = int_label(key) else { continue };
            reject_duplicate(&mut seen, label, "protected header")?;

            match HeaderLabel::from_i64(label) {
                Some(HeaderLabel::Algorithm) => {
                    let Value::Integer(id) = value else {
                        return Err(ProtocolError::InvalidHeader(
                            "algorithm is not an integer".to_string(),
                        ));
                    };
                    let id = i128::from(*id);
                    let parsed = i64::try_from(id).ok().and_then(Algorithm::from_i64);
                    algorithm = Some(parsed.ok_or(ProtocolError::UnsupportedAlgorithm(id))?);
                },
                Some(HeaderLabel::ContentType) => content_type = Some(text(value, "content type")?),
                Some(HeaderLabel::CwtClaims) => cwt_claims = Some(CwtClaims::from_cbor(value)?),
                Some(HeaderLabel::TraceMetadata) | None => {},
            }
        }

        let algorithm = algorithm.ok_or_else(|| {
            ProtocolError::InvalidHeader("protected header has no algorithm".to_string())
        })?;

        Ok(Self { algorithm, content_type, cwt_claims })
    }
}

/// Unsigned header parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnprotectedHeader {
    /// Trace metadata (label 100)
    pub trace_metadata: Option<TraceMetadata>,
}

impl UnprotectedHeader {
    /// Header carrying the given trace metadata.
    pub fn with_trace_metadata(trace_metadata: TraceMetadata) -> Self {
        Self { trace_metadata: Some(trace_metadata) }
    }

    pub(crate) fn to_cbor(&self) -> Value {
        let mut entries = Vec::with_capacity(1);
        if let Some(meta) = &self.trace_metadata {
            entries.push((int(HeaderLabel::TraceMetadata.to_i64()), meta.to_cbor()));
        }
        Value::Map(entries)
    }

    pub(crate) fn from_cbor(value: &Value) -> Result<Self> {
        let Value::Map(entries) = value else {
            return Err(ProtocolError::InvalidHeader("unprotected header is not a map".to_string()));
        };

        let mut header = Self::default();
        let mut seen = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let Some(label) = int_label(key) else { continue };
            reject_duplicate(&mut seen, label, "unprotected header")?;

            if HeaderLabel::from_i64(label) == Some(HeaderLabel::TraceMetadata) {
                header.trace_metadata = Some(TraceMetadata::from_cbor(value)?);
            }
        }
        Ok(header)
    }
}

pub(crate) fn encode_value(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
    Ok(buf)
}

/// Decode exactly one CBOR item from `bytes`.
pub(crate) fn decode_value(bytes: &[u8]) -> Result<Value> {
    let mut reader = bytes;
    let value: Value = ciborium::de::from_reader(&mut reader)
        .map_err(|e| ProtocolError::CborDecode(e.to_string()))?;
    if !reader.is_empty() {
        return Err(ProtocolError::TrailingBytes(reader.len()));
    }
    Ok(value)
}

fn int(value: i64) -> Value {
    Value::Integer(Integer::from(value))
}

/// Integer label of a map key; text and other keys yield `None`.
fn int_label(key: &Value) -> Option<i64> {
    match key {
        Value::Integer(label) => i64::try_from(*label).ok(),
        _ => None,
    }
}

fn text(value: &Value, field: &str) -> Result<String> {
    match value {
        Value::Text(text) => Ok(text.clone()),
        _ => Err(ProtocolError::InvalidHeader(format!("{field} is not a text string"))),
    }
}

fn reject_duplicate(seen: &mut Vec<i64>, label: i64, map: &str) -> Result<()> {
    if seen.contains(&label) {
        return Err(ProtocolError::InvalidHeader(format!("duplicate label {label} in {map}")));
    }
    seen.push(label);
    Ok(())
}
