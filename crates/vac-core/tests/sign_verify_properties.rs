//! Property-based tests for the sign/verify pipeline
//!
//! 1. **Round-trip**: every signed record verifies against itself
//! 2. **Tamper detection**: any single-byte change to the canonical bytes
//!    fails the signature check
//! 3. **Wrong key**: a different key never verifies
//! 4. **Detach/reattach**: the verifier's `Sig_structure` equals the signer's
//! 5. **Hash consistency**: the stored content hash is the digest of the
//!    recomputed canonical bytes

use proptest::prelude::*;
use serde_json::{Value, json};
use vac_core::{FixedClock, Signer, VacError, verify_detached, verify_record};
use vac_crypto::{SigningKeyPair, canonicalize};
use vac_proto::CoseSign1;

fn arbitrary_record() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 é\"\\\\-]{0,16}".prop_map(Value::String),
    ];
    let tree = leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z-]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    });

    (proptest::option::of("[a-z0-9]{1,8}"), tree).prop_map(|(session_id, body)| {
        let mut record = json!({"id": "rec", "body": body});
        if let Some(session_id) = session_id {
            record["session"] = json!({"session-id": session_id});
        }
        record
    })
}

fn arbitrary_seed() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

fn sign(record: &Value, key: &SigningKeyPair) -> Vec<u8> {
    Signer::with_clock(key, FixedClock::from_unix_secs(1_704_067_200))
        .sign(record)
        .unwrap()
        .into_bytes()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip(record in arbitrary_record(), seed in arbitrary_seed()) {
        let key = SigningKeyPair::from_seed(&seed);
        let envelope = sign(&record, &key);

        prop_assert!(verify_record(&envelope, &record, &key.public_key()).is_ok());
    }

    #[test]
    fn prop_single_byte_tamper_is_detected(
        record in arbitrary_record(),
        seed in arbitrary_seed(),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let key = SigningKeyPair::from_seed(&seed);
        let envelope = sign(&record, &key);

        let mut payload = canonicalize(&record).into_vec();
        let i = index.index(payload.len());
        payload[i] ^= flip;

        let result = verify_detached(&envelope, &payload, &key.public_key());
        prop_assert!(matches!(result, Err(VacError::SignatureInvalid { .. })), "got {:?}", result);
    }

    #[test]
    fn prop_wrong_key_is_rejected(
        record in arbitrary_record(),
        seed in arbitrary_seed(),
        other_seed in arbitrary_seed(),
    ) {
        prop_assume!(seed != other_seed);
        let key = SigningKeyPair::from_seed(&seed);
        let other = SigningKeyPair::from_seed(&other_seed);
        let envelope = sign(&record, &key);

        let result = verify_record(&envelope, &record, &other.public_key());
        prop_assert!(matches!(result, Err(VacError::SignatureInvalid { .. })), "got {:?}", result);
    }

    #[test]
    fn prop_reattached_sig_structure_matches(record in arbitrary_record(), seed in arbitrary_seed()) {
        let key = SigningKeyPair::from_seed(&seed);
        let canonical = canonicalize(&record);
        let attached = vac_core::encode_envelope(
            &key,
            canonical.as_bytes(),
            vac_proto::ProtectedHeader::eddsa_json(vac_proto::CwtClaims::new("i", "s")),
            vac_proto::UnprotectedHeader::default(),
        )
        .unwrap();
        let at_signing = attached.signing_input().unwrap();

        let stored = attached.detach().to_vec().unwrap();
        let at_verify = CoseSign1::decode(&stored)
            .unwrap()
            .attach(canonical.into_vec())
            .signing_input()
            .unwrap();

        prop_assert_eq!(at_signing, at_verify);
    }

    #[test]
    fn prop_content_hash_is_consistent(record in arbitrary_record(), seed in arbitrary_seed()) {
        let key = SigningKeyPair::from_seed(&seed);
        let envelope = sign(&record, &key);

        let verification = verify_record(&envelope, &record, &key.public_key()).unwrap();
        let stored = verification.content_hash().unwrap();
        prop_assert_eq!(stored, canonicalize(&record).digest().to_hex());
        prop_assert!(verification.content_hash_verified());
    }
}
