//! VAC Envelope Wire Format
//!
//! Encoding and decoding of the COSE_Sign1 envelope that carries a detached
//! Ed25519 signature over an agent record.
//!
//! # Layout
//!
//! ```text
//! 18([
//!     protected:   bstr .cbor { 1: -8, 3: "application/json", 15: { 1: iss, 2: sub } },
//!     unprotected: { 100: { "session-id": ..., "content-hash": ..., ... } },
//!     payload:     null,                 ; detached
//!     signature:   bstr .size 64,
//! ])
//! ```
//!
//! The signature covers `["Signature1", protected, h'', payload]`, where
//! `payload` is the canonical record bytes the verifier recomputes. Only the
//! protected header is authenticated; the unprotected map is descriptive.
//!
//! This crate knows nothing about keys or JSON. It produces and consumes
//! bytes; the signing pipeline lives one layer up.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod header;
pub mod labels;

pub use envelope::{CoseSign1, MAX_ENVELOPE_SIZE, PayloadSlot, Protected, sig_structure};
pub use errors::{ProtocolError, Result};
pub use header::{CwtClaims, ProtectedHeader, Timestamp, TraceMetadata, UnprotectedHeader};
pub use labels::{Algorithm, ClaimLabel, HeaderLabel};
