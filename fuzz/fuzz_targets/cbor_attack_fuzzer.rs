//! Fuzz target for hostile CBOR in envelope slots
//!
//! # Strategy
//!
//! - Deeply nested: arrays/maps nested to arbitrary depth in the unprotected
//!   header (stack overflow)
//! - Huge lengths: byte/text/array heads claiming massive lengths (memory)
//! - Duplicate labels: protected maps with a repeated label
//! - Protected bytes: arbitrary bytes inside the protected bstr
//! - Oversize: inputs just over the size limit
//!
//! # Invariants
//!
//! - Decoding completes quickly (no infinite loops)
//! - Nesting depth bounded by the decoder's recursion limit
//! - Huge claimed lengths rejected (not allocated)
//! - Duplicate labels rejected
//! - NEVER panic on malformed CBOR

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vac_proto::{CoseSign1, MAX_ENVELOPE_SIZE, ProtectedHeader};

#[derive(Debug, Clone, Arbitrary)]
enum CborAttack {
    DeeplyNested { depth: u8, nest_maps: bool },
    HugeLength { claimed_len_exponent: u8, slot: u8 },
    DuplicateLabels { count: u8 },
    ProtectedBytes { bytes: Vec<u8> },
    Oversize { extra: u8 },
}

/// `{1: -8}` as a byte string: the smallest valid protected slot.
const MINIMAL_PROTECTED: [u8; 4] = [0x43, 0xa1, 0x01, 0x27];

fuzz_target!(|attack: CborAttack| {
    match attack {
        CborAttack::DeeplyNested { depth, nest_maps } => {
            let mut unprotected = vec![0xa1, 0x18, 0x64];
            for _ in 0..depth {
                if nest_maps {
                    unprotected.extend_from_slice(&[0xa1, 0x61, b'a']);
                } else {
                    unprotected.push(0x81);
                }
            }
            unprotected.push(0x01);

            let _ = CoseSign1::decode(&envelope(&MINIMAL_PROTECTED, &unprotected));
        },

        CborAttack::HugeLength { claimed_len_exponent, slot } => {
            let exponent = u32::from(claimed_len_exponent % 33);
            let claimed = if exponent < 32 { 1u32 << exponent } else { u32::MAX };
            let head = match slot % 3 {
                0 => 0x5a,
                1 => 0x7a,
                _ => 0x9a,
            };
            let mut huge = vec![head];
            huge.extend_from_slice(&claimed.to_be_bytes());
            huge.extend(std::iter::repeat_n(0x01, (claimed as usize).min(8)));

            let _ = CoseSign1::decode(&envelope(&MINIMAL_PROTECTED, &huge));
            let _ = CoseSign1::decode(&envelope(&huge, &[0xa0]));
        },

        CborAttack::DuplicateLabels { count } => {
            let count = (count % 10).max(2);
            let mut map = vec![0xa0 | count];
            for _ in 0..count {
                map.extend_from_slice(&[0x01, 0x27]);
            }
            assert!(ProtectedHeader::from_bytes(&map).is_err());

            let mut protected = vec![0x40 | map.len() as u8];
            protected.extend_from_slice(&map);
            assert!(CoseSign1::decode(&envelope(&protected, &[0xa0])).is_err());
        },

        CborAttack::ProtectedBytes { bytes } => {
            let _ = ProtectedHeader::from_bytes(&bytes);
        },

        CborAttack::Oversize { extra } => {
            let bytes = vec![0u8; MAX_ENVELOPE_SIZE + 1 + usize::from(extra)];
            assert!(CoseSign1::decode(&bytes).is_err());
        },
    }
});

/// `18([protected, unprotected, null, h'00'])` from pre-encoded slot bytes.
fn envelope(protected: &[u8], unprotected: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xd2, 0x84];
    bytes.extend_from_slice(protected);
    bytes.extend_from_slice(unprotected);
    bytes.extend_from_slice(&[0xf6, 0x41, 0x00]);
    bytes
}
