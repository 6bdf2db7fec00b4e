//! Fuzz target for CoseSign1::decode
//!
//! Feeds arbitrary bytes to the envelope decoder, both raw and wrapped in a
//! tag-18 array header so the fuzzer reaches the slot checks quickly.
//!
//! # Invariants
//!
//! - NEVER panic on malformed input
//! - Anything that decodes re-encodes and decodes to an equal envelope

#![no_main]

use libfuzzer_sys::fuzz_target;
use vac_proto::CoseSign1;

fuzz_target!(|data: &[u8]| {
    check(data);

    let mut wrapped = vec![0xd2, 0x84];
    wrapped.extend_from_slice(data);
    check(&wrapped);
});

fn check(bytes: &[u8]) {
    let Ok(envelope) = CoseSign1::decode(bytes) else { return };

    let encoded = envelope.to_vec().expect("decoded envelope re-encodes");
    let again = CoseSign1::decode(&encoded).expect("re-encoded envelope decodes");
    assert_eq!(again.protected().as_bytes(), envelope.protected().as_bytes());
    assert_eq!(again.signature(), envelope.signature());
    assert_eq!(again.payload(), envelope.payload());
}
