//! End-to-end sign/verify scenarios on a representative record.

use serde_json::{Value, json};
use vac_core::{FixedClock, Signer, VacError, verify_record};
use vac_crypto::{SigningKeyPair, canonicalize, sha256};
use vac_proto::{CoseSign1, PayloadSlot, UnprotectedHeader};

fn record() -> Value {
    json!({
        "id": "abc",
        "session": {
            "session-id": "s1",
            "agent-meta": {"model-provider": "anthropic"},
            "session-start": "2024-01-01T00:00:00Z",
        },
    })
}

fn sign(record: &Value, key: &SigningKeyPair) -> Vec<u8> {
    Signer::with_clock(key, FixedClock::from_unix_secs(0)).sign(record).unwrap().into_bytes()
}

#[test]
fn scenario_a_sign_and_verify() {
    let key = SigningKeyPair::generate();
    let record = record();
    let envelope = sign(&record, &key);

    let decoded = CoseSign1::decode(&envelope).unwrap();
    let meta = decoded.unprotected().trace_metadata.as_ref().unwrap();
    let expected_hash = sha256(canonicalize(&record).as_bytes()).to_hex();
    assert_eq!(meta.session_id.as_deref(), Some("s1"));
    assert_eq!(meta.agent_vendor.as_deref(), Some("anthropic"));
    assert_eq!(meta.content_hash.as_deref(), Some(expected_hash.as_str()));

    let verification = verify_record(&envelope, &record, &key.public_key()).unwrap();
    assert_eq!(verification.session_id().unwrap(), "s1");
    assert_eq!(verification.agent_vendor().unwrap(), "anthropic");
    assert_eq!(verification.content_hash().unwrap(), expected_hash);
    assert!(verification.content_hash_verified());
}

#[test]
fn scenario_b_modified_record_fails_signature() {
    let key = SigningKeyPair::generate();
    let envelope = sign(&record(), &key);

    let mut modified = record();
    modified["session"]["session-id"] = json!("s2");

    let err = verify_record(&envelope, &modified, &key.public_key()).unwrap_err();
    assert!(matches!(err, VacError::SignatureInvalid { .. }), "got {err:?}");
}

#[test]
fn scenario_c_corrupted_hash_is_distinct_failure() {
    let key = SigningKeyPair::generate();
    let record = record();
    let envelope = CoseSign1::decode(&sign(&record, &key)).unwrap();

    let mut meta = envelope.unprotected().trace_metadata.clone().unwrap();
    let corrupted = "0".repeat(64);
    meta.content_hash = Some(corrupted.clone());
    let rewritten = CoseSign1::new(
        envelope.protected().clone(),
        UnprotectedHeader::with_trace_metadata(meta),
        PayloadSlot::Detached,
        envelope.signature().to_vec(),
    )
    .to_vec()
    .unwrap();

    let err = verify_record(&rewritten, &record, &key.public_key()).unwrap_err();
    assert_eq!(
        err,
        VacError::ContentHashMismatch {
            expected: corrupted,
            actual: sha256(canonicalize(&record).as_bytes()).to_hex(),
        }
    );
}

#[test]
fn key_order_in_source_text_does_not_matter() {
    let key = SigningKeyPair::generate();
    let signer = Signer::with_clock(&key, FixedClock::from_unix_secs(0));
    let envelope = signer
        .sign_str(r#"{"session":{"session-start":"2024-01-01T00:00:00Z","session-id":"s1"},"id":"abc"}"#)
        .unwrap()
        .into_bytes();

    let reordered = r#"{
        "id": "abc",
        "session": { "session-id": "s1", "session-start": "2024-01-01T00:00:00Z" }
    }"#;
    assert!(vac_core::verify_str(&envelope, reordered, &key.public_key()).is_ok());
}

#[test]
fn envelope_without_metadata_verifies_without_hash_check() {
    let key = SigningKeyPair::generate();
    let record = record();
    let envelope = CoseSign1::decode(&sign(&record, &key)).unwrap();

    let stripped = CoseSign1::new(
        envelope.protected().clone(),
        UnprotectedHeader::default(),
        PayloadSlot::Detached,
        envelope.signature().to_vec(),
    )
    .to_vec()
    .unwrap();

    let verification = verify_record(&stripped, &record, &key.public_key()).unwrap();
    assert!(!verification.content_hash_verified());
    assert_eq!(
        verification.session_id(),
        Err(VacError::MissingField { field: "session-id" })
    );
    assert_eq!(verification.subject().unwrap(), "s1");
}

#[test]
fn tampered_big_integer_fails_signature() {
    let key = SigningKeyPair::generate();
    let record = vac_core::parse_record(r#"{"id":"x","amount":18446744073709551616}"#).unwrap();
    let tampered = vac_core::parse_record(r#"{"id":"x","amount":18446744073709551617}"#).unwrap();
    let envelope = sign(&record, &key);

    assert!(verify_record(&envelope, &record, &key.public_key()).is_ok());
    let err = verify_record(&envelope, &tampered, &key.public_key()).unwrap_err();
    assert!(matches!(err, VacError::SignatureInvalid { .. }), "got {err:?}");
}
