//! VAC Signing Pipeline
//!
//! Signs agent conversation records with a detached COSE_Sign1 envelope and
//! verifies them against an independently sourced copy of the record.
//!
//! # Architecture
//!
//! ```text
//! record tree ──► canonicalize ──► CanonicalBytes
//!      │                                 │
//!      │ precedence chains               │ Ed25519 over Sig_structure
//!      ▼                                 ▼
//! CwtClaims + TraceMetadata ──────► CoseSign1 (attached) ──► detach ──► .sig.cbor
//! ```
//!
//! Verification runs the same canonicalization on the caller's record,
//! reattaches the bytes in memory, checks the signature and then compares the
//! stored content hash.
//!
//! # Determinism
//!
//! Signing is a pure function of the record, the key, the options and the
//! clock. The clock is consulted only when a record has neither
//! `session.session-start` nor `created`; inject a [`FixedClock`] to make
//! that case reproducible.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod batch;
pub mod claims;
pub mod clock;
mod error;
pub mod metadata;
pub mod precedence;
pub mod signer;
pub mod verifier;

pub use batch::{VerifyJob, sign_batch, sign_batch_with_key, verify_batch};
pub use claims::CwtClaimsBuilder;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, VacError};
pub use metadata::{TRACE_FORMAT, TraceMetadataBuilder};
pub use signer::{SignOptions, SignedRecord, Signer, encode_envelope, sign};
pub use verifier::{Verification, verify, verify_detached, verify_record, verify_str};

/// Parse JSON record text into a tree.
///
/// # Errors
///
/// - `VacError::InvalidRecord` if `text` is not a single JSON value
pub fn parse_record(text: &str) -> Result<serde_json::Value> {
    serde_json::from_str(text).map_err(|e| VacError::InvalidRecord { reason: e.to_string() })
}
