//! ACM PCA audit report records.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer};

use cagateway_connector::error::{ConnectorError, ConnectorResult};
use cagateway_connector::record::RequestDisposition;

/// One certificate row from a JSON audit report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuditRecord {
    #[serde(rename = "awsAccountId", default)]
    pub account_id: String,

    /// Joins against the host's `ca_request_id`.
    #[serde(rename = "certificateArn")]
    pub certificate_arn: String,

    #[serde(rename = "serial", default)]
    pub serial_number: String,

    #[serde(default)]
    pub subject: String,

    #[serde(rename = "notBefore", default, deserialize_with = "optional_timestamp")]
    pub not_before: Option<DateTime<Utc>>,

    #[serde(rename = "notAfter", default, deserialize_with = "optional_timestamp")]
    pub not_after: Option<DateTime<Utc>>,

    #[serde(rename = "issuedAt", default, deserialize_with = "optional_timestamp")]
    pub issued_date: Option<DateTime<Utc>>,

    #[serde(rename = "revokedAt", default, deserialize_with = "optional_timestamp")]
    pub revocation_date: Option<DateTime<Utc>>,

    #[serde(rename = "revocationReason", default)]
    pub revocation_reason: Option<String>,

    #[serde(rename = "templateArn", default)]
    pub template_arn: Option<String>,
}

impl AuditRecord {
    /// Disposition implied by the audit row: revoked iff a revocation date is present.
    #[must_use]
    pub fn disposition(&self) -> RequestDisposition {
        if self.revocation_date.is_some() {
            RequestDisposition::Revoked
        } else {
            RequestDisposition::Issued
        }
    }
}

/// Parse a complete audit report document.
pub fn parse_report(document: &[u8]) -> ConnectorResult<Vec<AuditRecord>> {
    serde_json::from_slice(document)
        .map_err(|e| ConnectorError::remote_with_source("Failed to parse audit report", e))
}

/// Parse an audit timestamp.
///
/// Reports write offsets without a colon (`+0000`), which RFC 3339 does not
/// allow, so both forms are accepted.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{value}'"))),
    }
}
