//! Certificate records and enrollment requests exchanged with the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Host-side disposition codes for a certificate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum RequestDisposition {
    /// Certificate issued and not revoked (20).
    Issued = 20,
    /// Certificate revoked (21).
    Revoked = 21,
}

impl RequestDisposition {
    /// Numeric code used by the host's record store.
    #[must_use]
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Create from a host status code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            20 => Some(Self::Issued),
            21 => Some(Self::Revoked),
            _ => None,
        }
    }
}

impl fmt::Display for RequestDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issued => write!(f, "issued"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

/// A certificate as known to the CA, in the shape the host stores it.
///
/// Records are built fresh from CA data and never mutated in place; the host
/// decides whether to persist them. Revocation data is present if and only
/// if `status` is [`RequestDisposition::Revoked`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    /// The CA's identifier for the certificate.
    pub ca_request_id: String,

    /// Base64 DER body, without PEM armour.
    pub certificate_pem: String,

    /// Host status code (see [`RequestDisposition`]).
    pub status: i32,

    /// Product classification tag.
    pub product_id: String,

    /// The certificate's `notBefore`, in UTC.
    pub submission_date: DateTime<Utc>,

    /// When the certificate was revoked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_date: Option<DateTime<Utc>>,

    /// Host revocation reason code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason_code: Option<u32>,
}

impl CertificateRecord {
    /// Create a record for an issued, unrevoked certificate.
    pub fn issued(
        ca_request_id: impl Into<String>,
        certificate_pem: impl Into<String>,
        product_id: impl Into<String>,
        submission_date: DateTime<Utc>,
    ) -> Self {
        Self {
            ca_request_id: ca_request_id.into(),
            certificate_pem: certificate_pem.into(),
            status: RequestDisposition::Issued.code(),
            product_id: product_id.into(),
            submission_date,
            revocation_date: None,
            revocation_reason_code: None,
        }
    }

    /// Return a revoked copy of this record.
    #[must_use]
    pub fn revoked(self, revocation_date: DateTime<Utc>, reason_code: u32) -> Self {
        Self {
            status: RequestDisposition::Revoked.code(),
            revocation_date: Some(revocation_date),
            revocation_reason_code: Some(reason_code),
            ..self
        }
    }

    /// The record's status as a known disposition, if it is one.
    pub fn disposition(&self) -> Option<RequestDisposition> {
        RequestDisposition::from_code(self.status)
    }

    /// Check if the record carries revoked status.
    pub fn is_revoked(&self) -> bool {
        self.disposition() == Some(RequestDisposition::Revoked)
    }
}

/// Kind of enrollment the host is performing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentType {
    #[default]
    New,
    Renew,
    Reissue,
}

/// Product selection for an enrollment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentProductInfo {
    /// Product identifier chosen by the host.
    pub product_id: String,

    /// Free-form product parameters.
    #[serde(default)]
    pub product_parameters: HashMap<String, String>,
}

impl EnrollmentProductInfo {
    /// Create product info with no parameters.
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            product_parameters: HashMap::new(),
        }
    }

    /// Add a product parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.product_parameters.insert(key.into(), value.into());
        self
    }
}

/// A certificate enrollment request from the host.
#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    /// PEM-armoured PKCS#10 request.
    pub csr: String,

    /// Requested subject.
    pub subject: String,

    /// Requested subject alternative names, keyed by SAN type.
    pub sans: HashMap<String, Vec<String>>,

    /// Product selection.
    pub product: EnrollmentProductInfo,

    /// New, renewal or reissue.
    pub enrollment_type: EnrollmentType,
}

impl EnrollmentRequest {
    /// Create a new-enrollment request for a CSR and product.
    pub fn new(csr: impl Into<String>, product: EnrollmentProductInfo) -> Self {
        Self {
            csr: csr.into(),
            subject: String::new(),
            sans: HashMap::new(),
            product,
            enrollment_type: EnrollmentType::New,
        }
    }

    /// Set the requested subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }
}
