//! COSE_Sign1 envelope with an explicit payload slot.
//!
//! The envelope is the CBOR item `18([protected, unprotected, payload,
//! signature])`. The payload slot is modelled as [`PayloadSlot`] rather than a
//! positional array element: the signer builds an `Attached` envelope,
//! [`CoseSign1::detach`] turns it into the persisted `Detached` form, and the
//! verifier calls [`CoseSign1::attach`] with bytes it derived itself.
//!
//! # Invariants
//!
//! - A persisted envelope always carries `null` in the payload slot, never an
//!   empty byte string.
//! - The signing input is built from the protected bytes exactly as received,
//!   never from a re-encoding of the decoded header.
//! - `attach(detach(e), p).signing_input() == e.signing_input()` whenever `p`
//!   is the payload `e` was built with.

use bytes::BufMut;
use ciborium::value::Value;

use crate::{
    errors::{ProtocolError, Result},
    header::{ProtectedHeader, UnprotectedHeader, decode_value, encode_value},
    labels::{COSE_SIGN1_TAG, SIGNATURE1_CONTEXT},
};

/// Largest envelope accepted by [`CoseSign1::decode`] (1 MiB).
///
/// A detached envelope holds only headers and a 64-byte signature, so real
/// envelopes are a few hundred bytes.
pub const MAX_ENVELOPE_SIZE: usize = 1024 * 1024;

/// Number of elements in a COSE_Sign1 array.
const COSE_SIGN1_ARITY: usize = 4;

/// Contents of the payload slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSlot {
    /// Payload bytes travel inside the envelope
    Attached(Vec<u8>),
    /// Payload is supplied out of band; encodes as CBOR `null`
    Detached,
}

impl PayloadSlot {
    /// True for the persisted, detached form.
    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Detached)
    }

    /// Payload bytes, if attached.
    pub fn as_attached(&self) -> Option<&[u8]> {
        match self {
            Self::Attached(bytes) => Some(bytes),
            Self::Detached => None,
        }
    }

    fn to_cbor(&self) -> Value {
        match self {
            Self::Attached(bytes) => Value::Bytes(bytes.clone()),
            Self::Detached => Value::Null,
        }
    }

    fn from_cbor(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(bytes) => Ok(Self::Attached(bytes)),
            Value::Null => Ok(Self::Detached),
            _ => Err(ProtocolError::InvalidStructure(
                "payload slot must be a byte string or null".to_string(),
            )),
        }
    }
}

/// A protected header together with its exact encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protected {
    header: ProtectedHeader,
    bytes: Vec<u8>,
}

impl Protected {
    /// Encode a header for signing.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(header: ProtectedHeader) -> Result<Self> {
        let bytes = header.to_bytes()?;
        Ok(Self { header, bytes })
    }

    /// Decode received protected bytes, keeping them verbatim.
    ///
    /// # Errors
    ///
    /// See [`ProtectedHeader::from_bytes`].
    pub fn decode(bytes: Vec<u8>) -> Result<Self> {
        let header = ProtectedHeader::from_bytes(&bytes)?;
        Ok(Self { header, bytes })
    }

    /// Decoded header.
    pub fn header(&self) -> &ProtectedHeader {
        &self.header
    }

    /// Encoded bytes as they appear in the envelope.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Build the COSE_Sign1 `Sig_structure`:
/// `["Signature1", protected, external_aad, payload]`.
///
/// # Errors
///
/// - `ProtocolError::CborEncode` if serialization fails
pub fn sig_structure(protected: &[u8], external_aad: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    encode_value(&Value::Array(vec![
        Value::Text(SIGNATURE1_CONTEXT.to_string()),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(external_aad.to_vec()),
        Value::Bytes(payload.to_vec()),
    ]))
}

/// A single-signer COSE envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct CoseSign1 {
    protected: Protected,
    unprotected: UnprotectedHeader,
    payload: PayloadSlot,
    signature: Vec<u8>,
}

impl CoseSign1 {
    /// Assemble an envelope from its four slots.
    pub fn new(
        protected: Protected,
        unprotected: UnprotectedHeader,
        payload: PayloadSlot,
        signature: Vec<u8>,
    ) -> Self {
        Self { protected, unprotected, payload, signature }
    }

    /// Protected header and its bytes.
    pub fn protected(&self) -> &Protected {
        &self.protected
    }

    /// Unprotected header.
    pub fn unprotected(&self) -> &UnprotectedHeader {
        &self.unprotected
    }

    /// Payload slot.
    pub fn payload(&self) -> &PayloadSlot {
        &self.payload
    }

    /// Raw signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Replace the payload slot with the detached marker.
    #[must_use]
    pub fn detach(self) -> Self {
        Self { payload: PayloadSlot::Detached, ..self }
    }

    /// Place externally supplied payload bytes in the slot.
    ///
    /// Used by the verifier on an in-memory copy; the persisted envelope is
    /// never rewritten.
    #[must_use]
    pub fn attach(self, payload: Vec<u8>) -> Self {
        Self { payload: PayloadSlot::Attached(payload), ..self }
    }

    /// Encoded `Sig_structure` with empty external AAD.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadDetached` if the payload is not attached
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn signing_input(&self) -> Result<Vec<u8>> {
        let payload = self.payload.as_attached().ok_or(ProtocolError::PayloadDetached)?;
        sig_structure(self.protected.as_bytes(), &[], payload)
    }

    /// Encode the tagged envelope to a buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        let mut writer = dst.writer();
        ciborium::ser::into_writer(&self.to_cbor(), &mut writer)
            .map_err(|e| ProtocolError::CborEncode(e.to_string()))
    }

    /// Encode the tagged envelope to a new vector.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(256);
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode a tagged envelope.
    ///
    /// # Security
    ///
    /// - Size Validation First: inputs over [`MAX_ENVELOPE_SIZE`] are rejected
    ///   before the CBOR parser sees them.
    /// - Exactly One Item: trailing bytes after the envelope are an error, so
    ///   two files cannot be concatenated into something that still parses.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EnvelopeTooLarge` if `bytes` exceeds the limit
    /// - `ProtocolError::CborDecode` / `TrailingBytes` for malformed CBOR
    /// - `ProtocolError::UnexpectedTag` if the item is not tagged 18
    /// - `ProtocolError::WrongArity` if the array does not have 4 elements
    /// - `ProtocolError::InvalidStructure` if a slot has the wrong CBOR type
    /// - header errors from [`ProtectedHeader::from_bytes`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_ENVELOPE_SIZE {
            return Err(ProtocolError::EnvelopeTooLarge {
                size: bytes.len(),
                max: MAX_ENVELOPE_SIZE,
            });
        }

        let body = match decode_value(bytes)? {
            Value::Tag(COSE_SIGN1_TAG, body) => *body,
            Value::Tag(tag, _) => {
                return Err(ProtocolError::UnexpectedTag {
                    expected: COSE_SIGN1_TAG,
                    found: Some(tag),
                });
            },
            _ => {
                return Err(ProtocolError::UnexpectedTag { expected: COSE_SIGN1_TAG, found: None });
            },
        };

        let Value::Array(items) = body else {
            return Err(ProtocolError::InvalidStructure(
                "COSE_Sign1 body is not an array".to_string(),
            ));
        };

        let found = items.len();
        let Ok([protected, unprotected, payload, signature]) =
            <[Value; COSE_SIGN1_ARITY]>::try_from(items)
        else {
            return Err(ProtocolError::WrongArity { expected: COSE_SIGN1_ARITY, found });
        };

        let Value::Bytes(protected) = protected else {
            return Err(ProtocolError::InvalidStructure(
                "protected header must be a byte string".to_string(),
            ));
        };

        let Value::Bytes(signature) = signature else {
            return Err(ProtocolError::InvalidStructure(
                "signature must be a byte string".to_string(),
            ));
        };

        Ok(Self {
            protected: Protected::decode(protected)?,
            unprotected: UnprotectedHeader::from_cbor(&unprotected)?,
            payload: PayloadSlot::from_cbor(payload)?,
            signature,
        })
    }

    fn to_cbor(&self) -> Value {
        Value::Tag(
            COSE_SIGN1_TAG,
            Box::new(Value::Array(vec![
                Value::Bytes(self.protected.as_bytes().to_vec()),
                self.unprotected.to_cbor(),
                self.payload.to_cbor(),
                Value::Bytes(self.signature.clone()),
            ])),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{CwtClaims, TraceMetadata};

    fn protected() -> Protected {
        Protected::encode(ProtectedHeader::eddsa_json(CwtClaims::new("anthropic", "s1"))).unwrap()
    }

    fn envelope(payload: &[u8]) -> CoseSign1 {
        let meta = TraceMetadata { session_id: Some("s1".to_string()), ..Default::default() };
        CoseSign1::new(
            protected(),
            UnprotectedHeader::with_trace_metadata(meta),
            PayloadSlot::Attached(payload.to_vec()),
            vec![7; 64],
        )
    }

    #[test]
    fn sig_structure_layout() {
        let bytes = sig_structure(protected().as_bytes(), &[], br#"{"a":1}"#).unwrap();
        insta::assert_snapshot!(
            hex::encode(bytes),
            @"846a5369676e6174757265315826a3012703706170706c69636174696f6e2f6a736f6e0fa20169616e7468726f7069630262733140477b2261223a317d"
        );
    }

    #[test]
    fn detached_envelope_layout() {
        let env = CoseSign1::new(
            protected(),
            UnprotectedHeader::default(),
            PayloadSlot::Detached,
            vec![0; 4],
        );
        insta::assert_snapshot!(
            hex::encode(env.to_vec().unwrap()),
            @"d2845826a3012703706170706c69636174696f6e2f6a736f6e0fa20169616e7468726f70696302627331a0f64400000000"
        );
    }

    #[test]
    fn detach_writes_null_payload() {
        let bytes = envelope(b"{}").detach().to_vec().unwrap();
        let Value::Tag(18, body) = decode_value(&bytes).unwrap() else { panic!("untagged") };
        let Value::Array(items) = *body else { panic!("not an array") };
        assert_eq!(items[2], Value::Null);
    }

    #[test]
    fn decode_round_trips_detached_envelope() {
        let original = envelope(b"{}").detach();
        let decoded = CoseSign1::decode(&original.to_vec().unwrap()).unwrap();

        assert_eq!(decoded, original);
        assert!(decoded.payload().is_detached());
        assert_eq!(decoded.protected().as_bytes(), original.protected().as_bytes());
    }

    #[test]
    fn reattached_signing_input_matches_original() {
        let original = envelope(br#"{"a":1}"#);
        let expected = original.signing_input().unwrap();

        let stored = original.detach().to_vec().unwrap();
        let reattached = CoseSign1::decode(&stored).unwrap().attach(br#"{"a":1}"#.to_vec());

        assert_eq!(reattached.signing_input().unwrap(), expected);
    }

    #[test]
    fn signing_input_requires_payload() {
        let detached = envelope(b"{}").detach();
        assert_eq!(detached.signing_input(), Err(ProtocolError::PayloadDetached));
    }

    #[test]
    fn decode_rejects_untagged_array() {
        let env = envelope(b"{}").detach();
        let Value::Tag(_, body) = env.to_cbor() else { panic!("untagged") };
        let bytes = encode_value(&body).unwrap();

        assert_eq!(
            CoseSign1::decode(&bytes),
            Err(ProtocolError::UnexpectedTag { expected: 18, found: None })
        );
    }

    #[test]
    fn decode_rejects_other_tag() {
        let bytes = encode_value(&Value::Tag(98, Box::new(Value::Array(vec![])))).unwrap();
        assert_eq!(
            CoseSign1::decode(&bytes),
            Err(ProtocolError::UnexpectedTag { expected: 18, found: Some(98) })
        );
    }

    #[test]
    fn decode_rejects_wrong_arity() {
        let body = Value::Array(vec![Value::Bytes(vec![]), Value::Map(vec![]), Value::Null]);
        let bytes = encode_value(&Value::Tag(18, Box::new(body))).unwrap();

        assert_eq!(
            CoseSign1::decode(&bytes),
            Err(ProtocolError::WrongArity { expected: 4, found: 3 })
        );
    }

    #[test]
    fn decode_rejects_wrong_slot_types() {
        let good = protected().as_bytes().to_vec();
        let cases = [
            vec![Value::Text("p".into()), Value::Map(vec![]), Value::Null, Value::Bytes(vec![])],
            vec![Value::Bytes(good.clone()), Value::Array(vec![]), Value::Null, Value::Bytes(vec![])],
            vec![Value::Bytes(good.clone()), Value::Map(vec![]), Value::Bool(true), Value::Bytes(vec![])],
            vec![Value::Bytes(good), Value::Map(vec![]), Value::Null, Value::Text("sig".into())],
        ];

        for items in cases {
            let bytes = encode_value(&Value::Tag(18, Box::new(Value::Array(items)))).unwrap();
            let err = CoseSign1::decode(&bytes).unwrap_err();
            assert!(
                matches!(err, ProtocolError::InvalidStructure(_) | ProtocolError::InvalidHeader(_)),
                "unexpected error: {err:?}"
            );
        }
    }

    #[test]
    fn decode_rejects_oversized_input() {
        let bytes = vec![0u8; MAX_ENVELOPE_SIZE + 1];
        assert_eq!(
            CoseSign1::decode(&bytes),
            Err(ProtocolError::EnvelopeTooLarge { size: MAX_ENVELOPE_SIZE + 1, max: MAX_ENVELOPE_SIZE })
        );
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = envelope(b"{}").detach().to_vec().unwrap();
        bytes.push(0x00);
        assert_eq!(CoseSign1::decode(&bytes), Err(ProtocolError::TrailingBytes(1)));
    }

    #[test]
    fn decode_keeps_protected_bytes_verbatim() {
        // Same header, but claims written before alg: must not be re-encoded.
        let reordered = encode_value(&Value::Map(vec![
            (Value::Integer(15.into()), Value::Map(vec![])),
            (Value::Integer(1.into()), Value::Integer((-8).into())),
        ]))
        .unwrap();
        let body = Value::Array(vec![
            Value::Bytes(reordered.clone()),
            Value::Map(vec![]),
            Value::Null,
            Value::Bytes(vec![1; 64]),
        ]);
        let bytes = encode_value(&Value::Tag(18, Box::new(body))).unwrap();

        let decoded = CoseSign1::decode(&bytes).unwrap();
        assert_eq!(decoded.protected().as_bytes(), reordered.as_slice());
        assert_eq!(decoded.protected().header().cwt_claims, Some(CwtClaims::default()));
    }
}
