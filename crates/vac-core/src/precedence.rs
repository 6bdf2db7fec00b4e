//! Fallback chains for values derived from a record tree.
//!
//! Each derived header field is read from the first location in a fixed list
//! that holds a usable value, falling back to [`UNKNOWN`] (or the clock, for
//! the start time). The chains decide what ends up in the unprotected header,
//! so two signers given the same record must walk them identically.
//!
//! | Field | Chain |
//! |---|---|
//! | session id | `session.session-id` → `id` → `"unknown"` |
//! | agent vendor | `session.agent-meta.model-provider` → `"unknown"` |
//! | start | `session.session-start` → `created` → clock |
//! | end | `session.session-end` → omitted |
//! | issuer | override → agent vendor chain |
//! | subject | override → session id chain |

use serde_json::Value;
use vac_proto::Timestamp;

use crate::clock::Clock;

/// Placeholder for an identifier the record does not carry.
pub const UNKNOWN: &str = "unknown";

/// Walk `path` through nested objects. A missing key or a non-object on the
/// way yields `None`.
pub fn lookup<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, key| node.as_object()?.get(*key))
}

/// First candidate that is `Some`.
pub fn first_present<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

/// Interpret a value as an identifier: strings as-is, numbers as decimal
/// text. Anything else counts as absent.
pub fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interpret a value as a timestamp: strings as text, integers and floats as
/// epoch numbers. Anything else counts as absent.
pub fn timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(s) => Some(Timestamp::Text(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(secs) => Some(Timestamp::Integer(secs)),
            None => n.as_f64().map(Timestamp::Float),
        },
        _ => None,
    }
}

fn identifier_at(record: &Value, path: &[&str]) -> Option<String> {
    lookup(record, path).and_then(identifier)
}

fn timestamp_at(record: &Value, path: &[&str]) -> Option<Timestamp> {
    lookup(record, path).and_then(timestamp)
}

/// `session.session-id` → `id` → `"unknown"`.
pub fn session_id(record: &Value) -> String {
    first_present([
        identifier_at(record, &["session", "session-id"]),
        identifier_at(record, &["id"]),
    ])
    .unwrap_or_else(|| UNKNOWN.to_string())
}

/// `session.agent-meta.model-provider` → `"unknown"`.
pub fn agent_vendor(record: &Value) -> String {
    identifier_at(record, &["session", "agent-meta", "model-provider"])
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// `session.session-start` → `created` → current time from `clock`.
pub fn session_start(record: &Value, clock: &dyn Clock) -> Timestamp {
    first_present([
        timestamp_at(record, &["session", "session-start"]),
        timestamp_at(record, &["created"]),
    ])
    .unwrap_or_else(|| Timestamp::Text(clock.now_rfc3339()))
}

/// `session.session-end`, or `None` to omit the field.
pub fn session_end(record: &Value) -> Option<Timestamp> {
    timestamp_at(record, &["session", "session-end"])
}

/// Issuer override → agent vendor chain.
pub fn issuer(record: &Value, issuer_override: Option<&str>) -> String {
    issuer_override.map_or_else(|| agent_vendor(record), str::to_string)
}

/// Subject override → session id chain.
pub fn subject(record: &Value, subject_override: Option<&str>) -> String {
    subject_override.map_or_else(|| session_id(record), str::to_string)
}
