//! Trace metadata derived from a record at signing time.

use serde_json::Value;
use tracing::debug;
use vac_crypto::{CONTENT_HASH_ALG, CanonicalBytes};
use vac_proto::TraceMetadata;

use crate::{clock::Clock, precedence};

/// Envelope generation tag written to `trace-format`.
pub const TRACE_FORMAT: &str = "ietf-vac-v3.0";

/// Builds the unprotected [`TraceMetadata`] for one record.
///
/// Every field but `timestamp-end` is always present in the output.
/// `content-hash` is computed from the canonical bytes the signature covers,
/// never from the record text as read.
pub struct TraceMetadataBuilder<'a> {
    record: &'a Value,
    canonical: &'a CanonicalBytes,
    clock: &'a dyn Clock,
    trace_format: &'a str,
}

impl<'a> TraceMetadataBuilder<'a> {
    /// Builder for `record`, whose canonical form is `canonical`.
    pub fn new(record: &'a Value, canonical: &'a CanonicalBytes, clock: &'a dyn Clock) -> Self {
        Self { record, canonical, clock, trace_format: TRACE_FORMAT }
    }

    /// Override the `trace-format` tag.
    #[must_use]
    pub fn trace_format(mut self, trace_format: &'a str) -> Self {
        self.trace_format = trace_format;
        self
    }

    /// Derive the metadata.
    pub fn build(&self) -> TraceMetadata {
        let meta = TraceMetadata {
            session_id: Some(precedence::session_id(self.record)),
            agent_vendor: Some(precedence::agent_vendor(self.record)),
            trace_format: Some(self.trace_format.to_string()),
            content_hash: Some(self.canonical.digest().to_hex()),
            content_hash_alg: Some(CONTENT_HASH_ALG.to_string()),
            timestamp_start: Some(precedence::session_start(self.record, self.clock)),
            timestamp_end: precedence::session_end(self.record),
        };

        debug!(
            session_id = ?meta.session_id,
            agent_vendor = ?meta.agent_vendor,
            content_hash = ?meta.content_hash,
            "derived trace metadata"
        );
        meta
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vac_crypto::canonicalize;
    use vac_proto::Timestamp;

    use super::*;
    use crate::clock::FixedClock;

    fn build(record: &Value) -> TraceMetadata {
        let canonical = canonicalize(record);
        let clock = FixedClock::from_unix_secs(1_704_067_200);
        TraceMetadataBuilder::new(record, &canonical, &clock).build()
    }

    #[test]
    fn full_record() {
        let record = json!({
            "id": "abc",
            "session": {
                "session-id": "s1",
                "agent-meta": {"model-provider": "anthropic"},
                "session-start": "2024-01-01T00:00:00Z",
                "session-end": "2024-01-01T01:00:00Z",
            },
        });
        let meta = build(&record);

        assert_eq!(meta.session_id.as_deref(), Some("s1"));
        assert_eq!(meta.agent_vendor.as_deref(), Some("anthropic"));
        assert_eq!(meta.trace_format.as_deref(), Some(TRACE_FORMAT));
        assert_eq!(meta.content_hash_alg.as_deref(), Some("sha-256"));
        assert_eq!(meta.content_hash, Some(canonicalize(&record).digest().to_hex()));
        assert_eq!(
            meta.timestamp_end,
            Some(Timestamp::Text("2024-01-01T01:00:00Z".to_string()))
        );
    }

    #[test]
    fn empty_record_falls_back() {
        let meta = build(&json!({}));

        assert_eq!(meta.session_id.as_deref(), Some("unknown"));
        assert_eq!(meta.agent_vendor.as_deref(), Some("unknown"));
        assert_eq!(
            meta.timestamp_start,
            Some(Timestamp::Text("2024-01-01T00:00:00Z".to_string()))
        );
        assert_eq!(meta.timestamp_end, None);
    }

    #[test]
    fn hash_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"id":"x","b":[1,2],"a":{"z":1,"y":2}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"y":2,"z":1},"b":[1,2],"id":"x"}"#).unwrap();
        assert_eq!(build(&a).content_hash, build(&b).content_hash);
    }

    #[test]
    fn trace_format_override() {
        let record = json!({});
        let canonical = canonicalize(&record);
        let clock = FixedClock::from_unix_secs(0);
        let meta =
            TraceMetadataBuilder::new(&record, &canonical, &clock).trace_format("custom").build();
        assert_eq!(meta.trace_format.as_deref(), Some("custom"));
    }
}
