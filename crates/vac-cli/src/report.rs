//! Human and JSON renderings of verification results.

use std::{fmt::Display, io::Write};

use serde::Serialize;
use vac_core::{VacError, Verification};

use crate::error::Result;

/// Shown for an optional field the envelope does not carry.
pub const NOT_PRESENT: &str = "not present";

/// Which verification step produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailedCheck {
    /// Envelope bytes could not be decoded
    Decode,
    /// Signature did not verify
    Signature,
    /// Stored content hash differs from the recomputed one
    ContentHash,
    /// Record could not be read as JSON
    Record,
}

impl FailedCheck {
    /// Classify a verification error.
    pub fn of(err: &VacError) -> Self {
        match err {
            VacError::ContentHashMismatch { .. } => Self::ContentHash,
            VacError::InvalidRecord { .. } => Self::Record,
            VacError::SignatureInvalid { .. } | VacError::KeyLoad { .. } => Self::Signature,
            VacError::EnvelopeDecode(_)
            | VacError::EnvelopeEncode(_)
            | VacError::MissingField { .. } => Self::Decode,
        }
    }
}

/// Machine-readable verification verdict.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerifyReport<'a> {
    /// Signature and content hash checks passed
    Pass {
        /// Decoded headers
        #[serde(flatten)]
        verification: &'a Verification,
    },
    /// A check failed
    Fail {
        /// Failing step
        check: FailedCheck,
        /// Error message
        error: String,
    },
}

impl<'a> VerifyReport<'a> {
    /// Report for a verification result.
    pub fn new(result: &'a vac_core::Result<Verification>) -> Self {
        match result {
            Ok(verification) => Self::Pass { verification },
            Err(err) => Self::Fail { check: FailedCheck::of(err), error: err.to_string() },
        }
    }

    /// Write as pretty-printed JSON.
    pub fn write_json(&self, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)?;
        Ok(())
    }
}

/// Render an optional field, mapping `MissingField` to [`NOT_PRESENT`].
fn field<T: Display>(value: vac_core::Result<T>) -> String {
    match value {
        Ok(value) => value.to_string(),
        Err(VacError::MissingField { .. }) => NOT_PRESENT.to_string(),
        Err(err) => err.to_string(),
    }
}

/// Write the `PASS:` block.
pub fn write_pass(out: &mut dyn Write, verification: &Verification) -> Result<()> {
    let hash = match verification.content_hash() {
        Ok(hash) if verification.content_hash_verified() => format!("{hash} (verified)"),
        other => field(other),
    };

    writeln!(out, "PASS: Signature verified")?;
    writeln!(out, "  Issuer:       {}", field(verification.issuer()))?;
    writeln!(out, "  Subject:      {}", field(verification.subject()))?;
    writeln!(out, "  Session ID:   {}", field(verification.session_id()))?;
    writeln!(out, "  Agent vendor: {}", field(verification.agent_vendor()))?;
    writeln!(out, "  Trace format: {}", field(verification.trace_format()))?;
    writeln!(out, "  Started:      {}", field(verification.timestamp_start()))?;
    writeln!(out, "  Ended:        {}", field(verification.timestamp_end()))?;
    writeln!(out, "  Content hash: {hash}")?;
    Ok(())
}

/// Write the `FAIL:` block naming the failing check.
pub fn write_fail(out: &mut dyn Write, err: &VacError) -> Result<()> {
    match err {
        VacError::SignatureInvalid { reason } => {
            writeln!(out, "FAIL: Signature is invalid ({reason})")?;
        },
        VacError::ContentHashMismatch { expected, actual } => {
            writeln!(out, "FAIL: Content hash mismatch")?;
            writeln!(out, "  Expected: {expected}")?;
            writeln!(out, "  Actual:   {actual}")?;
        },
        VacError::EnvelopeDecode(source) => {
            writeln!(out, "FAIL: Envelope could not be decoded ({source})")?;
        },
        other => writeln!(out, "FAIL: {other}")?,
    }
    Ok(())
}
