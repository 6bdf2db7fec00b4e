//! Signing pipeline: canonicalize, derive headers, sign, detach.
//!
//! ```text
//! record ──► canonicalize ──┬──► TraceMetadataBuilder ──► unprotected
//!                           │    CwtClaimsBuilder ──────► protected
//!                           ▼
//!                encode_envelope (Attached) ──► detach ──► envelope bytes
//! ```
//!
//! Nothing is written anywhere: the result is an in-memory [`SignedRecord`]
//! and callers persist [`SignedRecord::as_bytes`] once signing has fully
//! succeeded.

use serde_json::Value;
use tracing::{debug, info};
use vac_crypto::{CanonicalBytes, SigningKeyPair, canonicalize};
use vac_proto::{
    CoseSign1, CwtClaims, PayloadSlot, Protected, ProtectedHeader, TraceMetadata,
    UnprotectedHeader,
};

use crate::{
    claims::CwtClaimsBuilder,
    clock::{Clock, SystemClock},
    error::Result,
    metadata::{TRACE_FORMAT, TraceMetadataBuilder},
};

/// Signing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOptions {
    /// Replaces the issuer derived from the record
    pub issuer: Option<String>,
    /// Replaces the subject derived from the record
    pub subject: Option<String>,
    /// Value written to `trace-format`
    pub trace_format: String,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self { issuer: None, subject: None, trace_format: TRACE_FORMAT.to_string() }
    }
}

/// Build an attached COSE_Sign1 envelope over `payload`.
///
/// The signature covers `["Signature1", protected, h'', payload]`. The
/// returned envelope still carries the payload; call
/// [`CoseSign1::detach`] before persisting it.
///
/// # Errors
///
/// - `VacError::EnvelopeEncode` if the header or `Sig_structure` cannot be
///   serialized
pub fn encode_envelope(
    key: &SigningKeyPair,
    payload: &[u8],
    protected: ProtectedHeader,
    unprotected: UnprotectedHeader,
) -> Result<CoseSign1> {
    let protected = Protected::encode(protected)?;
    let to_be_signed = vac_proto::sig_structure(protected.as_bytes(), &[], payload)?;
    let signature = key.sign(&to_be_signed);

    Ok(CoseSign1::new(
        protected,
        unprotected,
        PayloadSlot::Attached(payload.to_vec()),
        signature.to_vec(),
    ))
}

/// Output of a successful signing.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRecord {
    envelope: CoseSign1,
    bytes: Vec<u8>,
    payload_len: usize,
}

impl SignedRecord {
    /// The detached envelope.
    pub fn envelope(&self) -> &CoseSign1 {
        &self.envelope
    }

    /// Encoded envelope, ready to persist.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the encoded envelope.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Length of the canonical bytes the signature covers.
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Claims written to the protected header.
    pub fn claims(&self) -> Option<&CwtClaims> {
        self.envelope.protected().header().cwt_claims.as_ref()
    }

    /// Metadata written to the unprotected header.
    pub fn trace_metadata(&self) -> Option<&TraceMetadata> {
        self.envelope.unprotected().trace_metadata.as_ref()
    }
}

/// Signs records with one key.
///
/// Holds the key by reference and the clock by value; `&Signer` can be
/// shared across threads.
pub struct Signer<'k, C = SystemClock> {
    key: &'k SigningKeyPair,
    clock: C,
    options: SignOptions,
}

impl<'k> Signer<'k, SystemClock> {
    /// Signer reading the system clock, with default options.
    pub fn new(key: &'k SigningKeyPair) -> Self {
        Self::with_clock(key, SystemClock)
    }
}

impl<'k, C: Clock> Signer<'k, C> {
    /// Signer reading `clock` for the start-time fallback.
    pub fn with_clock(key: &'k SigningKeyPair, clock: C) -> Self {
        Self { key, clock, options: SignOptions::default() }
    }

    /// Replace the signing options.
    #[must_use]
    pub fn options(mut self, options: SignOptions) -> Self {
        self.options = options;
        self
    }

    /// Sign a record tree.
    ///
    /// # Errors
    ///
    /// - `VacError::EnvelopeEncode` if serialization fails
    pub fn sign(&self, record: &Value) -> Result<SignedRecord> {
        let canonical = canonicalize(record);
        self.sign_canonical(record, &canonical)
    }

    /// Sign JSON record text.
    ///
    /// # Errors
    ///
    /// - `VacError::InvalidRecord` if `text` is not JSON
    /// - `VacError::EnvelopeEncode` if serialization fails
    pub fn sign_str(&self, text: &str) -> Result<SignedRecord> {
        let record = crate::parse_record(text)?;
        self.sign(&record)
    }

    fn sign_canonical(&self, record: &Value, canonical: &CanonicalBytes) -> Result<SignedRecord> {
        let meta = TraceMetadataBuilder::new(record, canonical, &self.clock)
            .trace_format(&self.options.trace_format)
            .build();
        let claims = CwtClaimsBuilder::new(record)
            .issuer(self.options.issuer.as_deref())
            .subject(self.options.subject.as_deref())
            .build();
        debug!(issuer = ?claims.issuer, subject = ?claims.subject, "derived claims");

        let session_id = meta.session_id.clone();
        let envelope = encode_envelope(
            self.key,
            canonical.as_bytes(),
            ProtectedHeader::eddsa_json(claims),
            UnprotectedHeader::with_trace_metadata(meta),
        )?
        .detach();
        let bytes = envelope.to_vec()?;

        info!(
            session_id = ?session_id,
            payload_len = canonical.len(),
            envelope_len = bytes.len(),
            "signed record"
        );

        Ok(SignedRecord { envelope, bytes, payload_len: canonical.len() })
    }
}

/// Sign `record` with `key` using the system clock and default options.
///
/// # Errors
///
/// See [`Signer::sign`].
pub fn sign(record: &Value, key: &SigningKeyPair) -> Result<SignedRecord> {
    Signer::new(key).sign(record)
}
