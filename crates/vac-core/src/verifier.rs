//! Verification pipeline: decode, reattach, check signature, cross-check
//! content hash.
//!
//! # Security
//!
//! The verifier never trusts bytes stored alongside the signature. The caller
//! supplies the record (or its canonical bytes) from an independent source
//! and the signature is checked against `Sig_structure` rebuilt from the
//! protected bytes exactly as received.
//!
//! The content-hash comparison runs only after the signature has verified
//! and reads a field from the unprotected header. It is a corruption
//! diagnostic: passing it adds no assurance beyond the signature, and failing
//! it means only that the unauthenticated header was altered.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use vac_crypto::{CanonicalBytes, PublicKey, canonicalize, sha256};
use vac_proto::{CoseSign1, CwtClaims, Timestamp, TraceMetadata, labels::trace};

use crate::error::{Result, VacError};

/// Decoded header contents of an envelope that passed verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    claims: Option<CwtClaims>,
    trace_metadata: Option<TraceMetadata>,
    content_hash_verified: bool,
}

impl Verification {
    /// Claims from the protected header.
    pub fn claims(&self) -> Option<&CwtClaims> {
        self.claims.as_ref()
    }

    /// Metadata from the unprotected header.
    pub fn trace_metadata(&self) -> Option<&TraceMetadata> {
        self.trace_metadata.as_ref()
    }

    /// True if a stored content hash was present and matched.
    pub fn content_hash_verified(&self) -> bool {
        self.content_hash_verified
    }

    /// Signed issuer claim.
    pub fn issuer(&self) -> Result<&str> {
        claim(self.claims.as_ref().and_then(|c| c.issuer.as_deref()), "issuer")
    }

    /// Signed subject claim.
    pub fn subject(&self) -> Result<&str> {
        claim(self.claims.as_ref().and_then(|c| c.subject.as_deref()), "subject")
    }

    /// `session-id` metadata.
    pub fn session_id(&self) -> Result<&str> {
        self.text_field(|m| m.session_id.as_deref(), trace::SESSION_ID)
    }

    /// `agent-vendor` metadata.
    pub fn agent_vendor(&self) -> Result<&str> {
        self.text_field(|m| m.agent_vendor.as_deref(), trace::AGENT_VENDOR)
    }

    /// `trace-format` metadata.
    pub fn trace_format(&self) -> Result<&str> {
        self.text_field(|m| m.trace_format.as_deref(), trace::TRACE_FORMAT)
    }

    /// `content-hash` metadata.
    pub fn content_hash(&self) -> Result<&str> {
        self.text_field(|m| m.content_hash.as_deref(), trace::CONTENT_HASH)
    }

    /// `timestamp-start` metadata.
    pub fn timestamp_start(&self) -> Result<&Timestamp> {
        let value = self.trace_metadata.as_ref().and_then(|m| m.timestamp_start.as_ref());
        value.ok_or(VacError::MissingField { field: trace::TIMESTAMP_START })
    }

    /// `timestamp-end` metadata.
    pub fn timestamp_end(&self) -> Result<&Timestamp> {
        let value = self.trace_metadata.as_ref().and_then(|m| m.timestamp_end.as_ref());
        value.ok_or(VacError::MissingField { field: trace::TIMESTAMP_END })
    }

    fn text_field<'a>(
        &'a self,
        get: impl FnOnce(&'a TraceMetadata) -> Option<&'a str>,
        field: &'static str,
    ) -> Result<&'a str> {
        self.trace_metadata.as_ref().and_then(get).ok_or(VacError::MissingField { field })
    }
}

fn claim<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str> {
    value.ok_or(VacError::MissingField { field })
}

/// Verify an envelope against externally supplied payload bytes.
///
/// The payload slot of the received envelope is ignored and replaced with
/// `payload` in memory; neither input is modified.
///
/// # Errors
///
/// - `VacError::EnvelopeDecode` if `envelope` is not a valid envelope,
///   including a `content-hash` that is not a text string
/// - `VacError::SignatureInvalid` if the signature does not cover `payload`
///   under `key`, or is not 64 bytes
/// - `VacError::ContentHashMismatch` if the signature verified but the stored
///   content hash differs from the hash of `payload`
///
/// An empty stored `content-hash` counts as absent and skips the hash check.
pub fn verify_detached(envelope: &[u8], payload: &[u8], key: &PublicKey) -> Result<Verification> {
    let decoded = CoseSign1::decode(envelope).inspect_err(|e| {
        warn!(error = %e, "envelope decode failed");
    })?;
    if !decoded.payload().is_detached() {
        debug!("envelope carries an inline payload; replacing it with the supplied bytes");
    }

    let signature = decoded.signature().to_vec();
    let reattached = decoded.attach(payload.to_vec());
    let to_be_verified = reattached.signing_input()?;

    key.verify(&to_be_verified, &signature).inspect_err(|e| {
        warn!(key = %key.fingerprint(), error = %e, "signature verification failed");
    })?;

    let claims = reattached.protected().header().cwt_claims.clone();
    let trace_metadata = reattached.unprotected().trace_metadata.clone();

    let stored_hash = trace_metadata
        .as_ref()
        .and_then(|m| m.content_hash.as_deref())
        .filter(|hash| !hash.is_empty());
    let content_hash_verified = match stored_hash {
        Some(expected) => {
            let actual = sha256(payload);
            if !actual.matches_hex(expected) {
                warn!(expected, actual = %actual, "content hash mismatch");
                return Err(VacError::ContentHashMismatch {
                    expected: expected.to_string(),
                    actual: actual.to_hex(),
                });
            }
            true
        },
        None => false,
    };

    info!(
        key = %key.fingerprint(),
        content_hash_verified,
        "signature verified"
    );

    Ok(Verification { claims, trace_metadata, content_hash_verified })
}

/// Verify an envelope against canonical record bytes.
///
/// # Errors
///
/// See [`verify_detached`].
pub fn verify(envelope: &[u8], canonical: &CanonicalBytes, key: &PublicKey) -> Result<Verification> {
    verify_detached(envelope, canonical.as_bytes(), key)
}

/// Verify an envelope against a record tree, canonicalizing it first.
///
/// # Errors
///
/// See [`verify_detached`].
pub fn verify_record(envelope: &[u8], record: &Value, key: &PublicKey) -> Result<Verification> {
    verify(envelope, &canonicalize(record), key)
}

/// Verify an envelope against JSON record text.
///
/// # Errors
///
/// - `VacError::InvalidRecord` if `text` is not JSON
/// - otherwise see [`verify_detached`]
pub fn verify_str(envelope: &[u8], text: &str, key: &PublicKey) -> Result<Verification> {
    let record = crate::parse_record(text)?;
    verify_record(envelope, &record, key)
}
