//! Error types for signing and verification.
//!
//! Lower crates keep their own error enums; this one is what callers of the
//! pipeline see. Conversions happen at the crate boundary with `From`.

use thiserror::Error;
use vac_crypto::CryptoError;
use vac_proto::ProtocolError;

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, VacError>;

/// Errors from the sign and verify pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VacError {
    /// Key material is malformed or of the wrong type
    #[error("key load failed: {reason}")]
    KeyLoad {
        /// Why the key could not be loaded
        reason: String,
    },

    /// Record text is not a JSON value tree
    #[error("invalid record: {reason}")]
    InvalidRecord {
        /// Parser message
        reason: String,
    },

    /// Envelope could not be serialized
    #[error("envelope encode failed: {0}")]
    EnvelopeEncode(String),

    /// Envelope bytes are not a well-formed COSE_Sign1 for this format
    #[error("envelope decode failed: {0}")]
    EnvelopeDecode(#[source] ProtocolError),

    /// Signature does not match the supplied record under the supplied key
    #[error("signature invalid: {reason}")]
    SignatureInvalid {
        /// Why verification failed
        reason: String,
    },

    /// Signature verified but the stored content hash disagrees with the
    /// recomputed one
    ///
    /// The content hash lives in the unprotected header, so this only ever
    /// signals corruption of an unauthenticated field.
    #[error("content hash mismatch: expected {expected}, actual {actual}")]
    ContentHashMismatch {
        /// Hash stored in the envelope
        expected: String,
        /// Hash of the supplied record
        actual: String,
    },

    /// An optional header field is absent
    #[error("{field} not present")]
    MissingField {
        /// Wire name of the field
        field: &'static str,
    },
}

impl VacError {
    /// Returns true if the error means the operation failed.
    ///
    /// [`VacError::MissingField`] is informational: callers render it as
    /// "not present" and carry on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MissingField { .. })
    }

    /// Returns true if the error is a verification verdict (FAIL) rather
    /// than a problem reading inputs.
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, Self::SignatureInvalid { .. } | Self::ContentHashMismatch { .. })
    }
}

impl From<CryptoError> for VacError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyLoad { reason } => Self::KeyLoad { reason },
            CryptoError::KeyEncode { reason } => Self::EnvelopeEncode(reason),
            CryptoError::SignatureInvalid { reason } => Self::SignatureInvalid { reason },
            CryptoError::InvalidRecord { reason } => Self::InvalidRecord { reason },
        }
    }
}

impl From<ProtocolError> for VacError {
    fn from(err: ProtocolError) -> Self {
        if err.is_decode_error() {
            Self::EnvelopeDecode(err)
        } else {
            Self::EnvelopeEncode(err.to_string())
        }
    }
}
