//! Translation between host revocation codes and ACM PCA revocation reasons.
//!
//! Host codes follow RFC 5280 `CRLReason` numbering; ACM PCA uses its own
//! string enumeration. Both directions are total: anything not in the table
//! maps to "unspecified".

use std::fmt;

/// ACM PCA revocation reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeRevocationReason {
    Unspecified,
    KeyCompromise,
    CertificateAuthorityCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    PrivilegeWithdrawn,
    AaCompromise,
}

/// Host code to native reason. Code 0 is handled by the fallback.
const REASON_TABLE: &[(u32, NativeRevocationReason)] = &[
    (1, NativeRevocationReason::KeyCompromise),
    (2, NativeRevocationReason::CertificateAuthorityCompromise),
    (3, NativeRevocationReason::AffiliationChanged),
    (4, NativeRevocationReason::Superseded),
    (5, NativeRevocationReason::CessationOfOperation),
    (9, NativeRevocationReason::PrivilegeWithdrawn),
    (10, NativeRevocationReason::AaCompromise),
];

/// Host code for an unspecified reason.
pub const UNSPECIFIED_CODE: u32 = 0;

impl NativeRevocationReason {
    /// Wire value used by the ACM PCA API and audit reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::KeyCompromise => "KEY_COMPROMISE",
            Self::CertificateAuthorityCompromise => "CERTIFICATE_AUTHORITY_COMPROMISE",
            Self::AffiliationChanged => "AFFILIATION_CHANGED",
            Self::Superseded => "SUPERSEDED",
            Self::CessationOfOperation => "CESSATION_OF_OPERATION",
            Self::PrivilegeWithdrawn => "PRIVILEGE_WITHDRAWN",
            Self::AaCompromise => "A_A_COMPROMISE",
        }
    }
}

impl fmt::Display for NativeRevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<NativeRevocationReason> for aws_sdk_acmpca::types::RevocationReason {
    fn from(reason: NativeRevocationReason) -> Self {
        aws_sdk_acmpca::types::RevocationReason::from(reason.as_str())
    }
}

/// Convert a host revocation code to the ACM PCA reason.
#[must_use]
pub fn to_native(code: u32) -> NativeRevocationReason {
    REASON_TABLE
        .iter()
        .find(|(host, _)| *host == code)
        .map(|(_, native)| *native)
        .unwrap_or(NativeRevocationReason::Unspecified)
}

/// Convert an ACM PCA reason string to the host revocation code.
///
/// Comparison ignores ASCII case.
#[must_use]
pub fn from_native(value: &str) -> u32 {
    REASON_TABLE
        .iter()
        .find(|(_, native)| native.as_str().eq_ignore_ascii_case(value.trim()))
        .map(|(host, _)| *host)
        .unwrap_or(UNSPECIFIED_CODE)
}
