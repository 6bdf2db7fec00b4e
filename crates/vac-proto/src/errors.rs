//! Error types for envelope encoding and decoding.

use thiserror::Error;

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors from the envelope wire format.
///
/// Everything except [`ProtocolError::CborEncode`] and
/// [`ProtocolError::PayloadDetached`] describes malformed input bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// CBOR serialization failed
    #[error("CBOR encode failed: {0}")]
    CborEncode(String),

    /// Input is not well-formed CBOR
    #[error("CBOR decode failed: {0}")]
    CborDecode(String),

    /// Envelope exceeds the size accepted before parsing
    #[error("envelope too large: {size} bytes (max {max})")]
    EnvelopeTooLarge {
        /// Actual size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Bytes remain after the envelope item
    #[error("{0} trailing bytes after envelope")]
    TrailingBytes(usize),

    /// Outer CBOR tag is missing or not COSE_Sign1
    #[error("unexpected tag: expected {expected}, found {found:?}")]
    UnexpectedTag {
        /// Required tag
        expected: u64,
        /// Tag that was present, `None` for an untagged item
        found: Option<u64>,
    },

    /// COSE_Sign1 body is an array of the wrong length
    #[error("wrong arity: expected {expected} elements, found {found}")]
    WrongArity {
        /// Required element count
        expected: usize,
        /// Actual element count
        found: usize,
    },

    /// An envelope slot holds the wrong CBOR type
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    /// A header map or one of its values cannot be interpreted
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The protected header names an algorithm other than EdDSA
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(i128),

    /// A signing input was requested while the payload slot is detached
    #[error("payload is detached; reattach it before building the signing input")]
    PayloadDetached,
}

impl ProtocolError {
    /// True if this error was caused by malformed envelope bytes.
    pub fn is_decode_error(&self) -> bool {
        !matches!(self, Self::CborEncode(_) | Self::PayloadDetached)
    }
}
