//! Wall-clock abstraction.
//!
//! The only non-deterministic input to signing is the `timestamp-start`
//! fallback used when a record carries no start time. Reading the clock
//! through [`Clock`] lets tests pin it with [`FixedClock`].

use chrono::{DateTime, SecondsFormat, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// Current time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current time as `YYYY-MM-DDTHH:MM:SSZ`.
    fn now_rfc3339(&self) -> String {
        format_rfc3339(self.now_utc())
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::disallowed_methods)]
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Clock pinned at `at`.
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Clock pinned at `secs` seconds after the Unix epoch. Out-of-range
    /// values pin the clock at the epoch.
    pub fn from_unix_secs(secs: i64) -> Self {
        Self(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format with whole seconds and a `Z` suffix.
pub fn format_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
