//! Fuzz target for canonical serialization
//!
//! # Invariants
//!
//! - NEVER panic on any JSON text
//! - Canonical output parses back as JSON
//! - Canonicalizing canonical output is a no-op

#![no_main]

use libfuzzer_sys::fuzz_target;
use vac_crypto::canonicalize_str;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };
    let Ok(once) = canonicalize_str(text) else { return };

    let canonical = std::str::from_utf8(once.as_bytes()).expect("canonical output is UTF-8");
    let twice = canonicalize_str(canonical).expect("canonical output parses");
    assert_eq!(once, twice);
});
