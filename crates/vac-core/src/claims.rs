//! CWT claims derived from a record at signing time.

use serde_json::Value;
use vac_proto::CwtClaims;

use crate::precedence;

/// Builds the protected [`CwtClaims`] for one record.
///
/// Claims are signed, so unlike trace metadata a verifier can rely on them.
/// Both claims are always present in the output.
#[derive(Debug, Clone, Copy)]
pub struct CwtClaimsBuilder<'a> {
    record: &'a Value,
    issuer: Option<&'a str>,
    subject: Option<&'a str>,
}

impl<'a> CwtClaimsBuilder<'a> {
    /// Builder for `record` with no overrides.
    pub fn new(record: &'a Value) -> Self {
        Self { record, issuer: None, subject: None }
    }

    /// Use `issuer` instead of the record's model provider.
    #[must_use]
    pub fn issuer(mut self, issuer: Option<&'a str>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Use `subject` instead of the record's session id.
    #[must_use]
    pub fn subject(mut self, subject: Option<&'a str>) -> Self {
        self.subject = subject;
        self
    }

    /// Derive the claims.
    pub fn build(&self) -> CwtClaims {
        CwtClaims::new(
            precedence::issuer(self.record, self.issuer),
            precedence::subject(self.record, self.subject),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn derived_from_record() {
        let record = json!({
            "id": "abc",
            "session": {"session-id": "s1", "agent-meta": {"model-provider": "anthropic"}},
        });
        assert_eq!(CwtClaimsBuilder::new(&record).build(), CwtClaims::new("anthropic", "s1"));
    }

    #[test]
    fn overrides_replace_derived_values() {
        let record = json!({"id": "abc"});
        let claims = CwtClaimsBuilder::new(&record)
            .issuer(Some("audit-bot"))
            .subject(Some("case-9"))
            .build();
        assert_eq!(claims, CwtClaims::new("audit-bot", "case-9"));
    }

    #[test]
    fn subject_falls_back_to_record_id() {
        let record = json!({"id": "abc"});
        assert_eq!(CwtClaimsBuilder::new(&record).build(), CwtClaims::new("unknown", "abc"));
    }
}
