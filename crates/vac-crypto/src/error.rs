//! Error types for key handling and signature checks

use thiserror::Error;

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors from key material, canonicalization and signature operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key material is malformed or of the wrong type
    ///
    /// Covers a public key handed to the private loader (and vice versa),
    /// non-Ed25519 keys, and PEM armor that fails to parse.
    #[error("key load failed: {reason}")]
    KeyLoad {
        /// Why the key could not be loaded
        reason: String,
    },

    /// Key material could not be encoded to PEM
    #[error("key encode failed: {reason}")]
    KeyEncode {
        /// Why encoding failed
        reason: String,
    },

    /// Signature did not verify, or the signature bytes are malformed
    #[error("signature invalid: {reason}")]
    SignatureInvalid {
        /// Why verification failed
        reason: String,
    },

    /// Record text is not a JSON value tree
    #[error("invalid record: {reason}")]
    InvalidRecord {
        /// Parser message
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if retrying with the same inputs cannot succeed.
    ///
    /// Every variant describes a property of the inputs themselves, so this
    /// only returns false for encoding failures, which depend on allocator
    /// state rather than the key.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::KeyLoad { .. } | Self::SignatureInvalid { .. } | Self::InvalidRecord { .. } => {
                true
            },
            Self::KeyEncode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_invalid_is_fatal() {
        let err = CryptoError::SignatureInvalid { reason: "bad".to_string() };
        assert!(err.is_fatal());
    }

    #[test]
    fn key_encode_is_not_fatal() {
        let err = CryptoError::KeyEncode { reason: "oom".to_string() };
        assert!(!err.is_fatal());
    }

    #[test]
    fn error_display() {
        let err = CryptoError::KeyLoad { reason: "not a private key".to_string() };
        assert_eq!(err.to_string(), "key load failed: not a private key");
    }
}
