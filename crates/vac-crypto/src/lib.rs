//! VAC Cryptographic Primitives
//!
//! Building blocks shared by the signer and the verifier of agent records.
//! Everything here is a pure function of its inputs except key generation,
//! which draws from the OS RNG.
//!
//! # Detached Signing Model
//!
//! The signer and the verifier never exchange the signed bytes. Both sides
//! derive them independently from a record tree:
//!
//! ```text
//! Record tree (JSON)
//!        │
//!        ▼
//! canonicalize → CanonicalBytes ──► SHA-256 → content hash (informational)
//!        │
//!        ▼
//! Ed25519 over Sig_structure(CanonicalBytes)
//! ```
//!
//! The only thing that must agree between the two sides is the output of
//! [`canonicalize`]. A stored copy of the signed bytes is never trusted.
//!
//! # Security
//!
//! Key material:
//! - Private keys are loaded from PKCS#8 PEM and public keys from
//!   SubjectPublicKeyInfo PEM; any other encoding is a [`CryptoError::KeyLoad`]
//! - The private half is zeroized on drop and redacted from `Debug`
//! - Keys are read-only after load and may be shared across threads
//!
//! Content digest:
//! - The SHA-256 hex digest is carried in an unauthenticated header; it is a
//!   corruption diagnostic, never a trust anchor

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod canonical;
pub mod digest;
mod error;
pub mod keys;

pub use canonical::{CanonicalBytes, canonicalize, canonicalize_str};
pub use digest::{CONTENT_HASH_ALG, ContentDigest, sha256};
pub use error::{CryptoError, Result};
pub use keys::{PublicKey, SIGNATURE_LENGTH, SigningKeyPair};
