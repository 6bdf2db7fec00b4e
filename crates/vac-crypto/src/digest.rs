//! SHA-256 content digest over canonical bytes

use std::fmt;

use sha2::{Digest, Sha256};

/// Algorithm name written next to the digest in trace metadata.
pub const CONTENT_HASH_ALG: &str = "sha-256";

/// A SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding, the form stored in `content-hash`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Compare against a stored `content-hash` string.
    ///
    /// Exact match against the lowercase hex form; a stored value in any
    /// other case or length does not match.
    pub fn matches_hex(&self, stored: &str) -> bool {
        self.to_hex() == stored
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

/// SHA-256 of `bytes`.
pub fn sha256(bytes: &[u8]) -> ContentDigest {
    ContentDigest(Sha256::digest(bytes).into())
}
