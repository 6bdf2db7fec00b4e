//! Fuzz target for the sign/verify pipeline
//!
//! Signs a fuzzer-chosen record, then applies a fuzzer-chosen mutation to the
//! envelope or the payload before verifying.
//!
//! # Invariants
//!
//! - An unmodified pair always verifies
//! - A changed payload never verifies
//! - A mutated envelope never panics the verifier
//! - A mutated envelope that still verifies carries the same signature and
//!   protected bytes (only unauthenticated bytes changed)

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::json;
use vac_core::{FixedClock, Signer, verify_detached};
use vac_crypto::{SigningKeyPair, canonicalize};
use vac_proto::CoseSign1;

#[derive(Debug, Arbitrary)]
struct Input {
    seed: [u8; 32],
    session_id: String,
    body: Vec<u8>,
    mutation: Mutation,
}

#[derive(Debug, Arbitrary)]
enum Mutation {
    None,
    FlipEnvelopeByte { index: usize, mask: u8 },
    FlipPayloadByte { index: usize, mask: u8 },
    TruncateEnvelope { keep: usize },
}

fuzz_target!(|input: Input| {
    let key = SigningKeyPair::from_seed(&input.seed);
    let record = json!({
        "session": {"session-id": input.session_id},
        "body": String::from_utf8_lossy(&input.body),
    });
    let signed = Signer::with_clock(&key, FixedClock::from_unix_secs(0))
        .sign(&record)
        .expect("signing a JSON tree succeeds");
    let mut envelope = signed.as_bytes().to_vec();
    let mut payload = canonicalize(&record).into_vec();
    let public = key.public_key();

    match input.mutation {
        Mutation::None => {
            assert!(verify_detached(&envelope, &payload, &public).is_ok());
        },
        Mutation::FlipEnvelopeByte { index, mask } => {
            if mask == 0 {
                return;
            }
            let i = index % envelope.len();
            envelope[i] ^= mask;
            if verify_detached(&envelope, &payload, &public).is_ok() {
                let original = signed.envelope();
                let mutated = CoseSign1::decode(&envelope).expect("verified envelope decodes");
                assert_eq!(mutated.signature(), original.signature());
                assert_eq!(mutated.protected().as_bytes(), original.protected().as_bytes());
            }
        },
        Mutation::FlipPayloadByte { index, mask } => {
            if mask == 0 {
                return;
            }
            let i = index % payload.len();
            payload[i] ^= mask;
            assert!(verify_detached(&envelope, &payload, &public).is_err());
        },
        Mutation::TruncateEnvelope { keep } => {
            envelope.truncate(keep % envelope.len());
            assert!(verify_detached(&envelope, &payload, &public).is_err());
        },
    }
});
