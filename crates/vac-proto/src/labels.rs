//! Label table shared by the envelope encoder and decoder.
//!
//! Every integer label and fixed string that appears on the wire is named
//! here once. The encoder writes these values and the decoder matches on the
//! same enums, so the two sides cannot drift apart.
//!
//! | Where | Label | Meaning |
//! |---|---|---|
//! | protected | 1 | algorithm (EdDSA = -8) |
//! | protected | 3 | content type (`application/json`) |
//! | protected | 15 | CWT claims map |
//! | CWT claims | 1 | issuer |
//! | CWT claims | 2 | subject |
//! | unprotected | 100 | trace metadata (private use) |

/// CBOR tag for a tagged COSE_Sign1 structure.
pub const COSE_SIGN1_TAG: u64 = 18;

/// Context string that opens a COSE_Sign1 `Sig_structure`.
pub const SIGNATURE1_CONTEXT: &str = "Signature1";

/// Content type of the detached payload.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Integer labels used in the protected and unprotected header maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum HeaderLabel {
    /// Signing algorithm identifier
    Algorithm = 1,
    /// Payload content type
    ContentType = 3,
    /// CWT claims set (RFC 9597)
    CwtClaims = 15,
    /// Trace metadata map (private-use range)
    TraceMetadata = 100,
}

impl HeaderLabel {
    /// Wire value of this label.
    #[must_use]
    pub const fn to_i64(self) -> i64 {
        self as i64
    }

    /// Parse a wire label. Unknown labels return `None` and are ignored by
    /// the decoder.
    #[must_use]
    pub const fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Algorithm),
            3 => Some(Self::ContentType),
            15 => Some(Self::CwtClaims),
            100 => Some(Self::TraceMetadata),
            _ => None,
        }
    }
}

/// Integer labels inside the CWT claims map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum ClaimLabel {
    /// `iss`: who asserted the record
    Issuer = 1,
    /// `sub`: what the record is about
    Subject = 2,
}

impl ClaimLabel {
    /// Wire value of this label.
    #[must_use]
    pub const fn to_i64(self) -> i64 {
        self as i64
    }

    /// Parse a wire label.
    #[must_use]
    pub const fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Issuer),
            2 => Some(Self::Subject),
            _ => None,
        }
    }
}

/// COSE algorithm identifiers this envelope understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum Algorithm {
    /// EdDSA, used here with Ed25519 only
    EdDsa = -8,
}

impl Algorithm {
    /// Wire value of this algorithm.
    #[must_use]
    pub const fn to_i64(self) -> i64 {
        self as i64
    }

    /// Parse a wire algorithm identifier.
    #[must_use]
    pub const fn from_i64(value: i64) -> Option<Self> {
        match value {
            -8 => Some(Self::EdDsa),
            _ => None,
        }
    }
}

/// Text keys of the trace metadata map.
pub mod trace {
    /// Session identifier
    pub const SESSION_ID: &str = "session-id";
    /// Vendor of the agent that produced the session
    pub const AGENT_VENDOR: &str = "agent-vendor";
    /// Envelope generation tag
    pub const TRACE_FORMAT: &str = "trace-format";
    /// Hex digest of the canonical record bytes
    pub const CONTENT_HASH: &str = "content-hash";
    /// Digest algorithm name
    pub const CONTENT_HASH_ALG: &str = "content-hash-alg";
    /// Session start time
    pub const TIMESTAMP_START: &str = "timestamp-start";
    /// Session end time, omitted when unknown
    pub const TIMESTAMP_END: &str = "timestamp-end";
}
