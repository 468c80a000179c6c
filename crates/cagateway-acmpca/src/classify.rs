//! Product classification of issued certificates.
//!
//! ACM PCA does not report which template a certificate was issued from, so
//! the product is inferred from the extended key usage extension.

use base64::Engine;
use chrono::{DateTime, Utc};
use std::fmt;
use x509_parser::prelude::*;

use cagateway_connector::error::{ConnectorError, ConnectorResult};

/// Coarse product label derived from a certificate's usages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductLabel {
    /// No extended key usage; CA certificates land here.
    Unknown,
    /// End-entity certificate with both or neither of server/client auth.
    EndEntity,
    /// End-entity certificate restricted to TLS server authentication.
    EndEntityServerAuth,
    /// End-entity certificate restricted to TLS client authentication.
    EndEntityClientAuth,
}

impl ProductLabel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::EndEntity => "EndEntity",
            Self::EndEntityServerAuth => "EndEntityServerAuth",
            Self::EndEntityClientAuth => "EndEntityClientAuth",
        }
    }
}

impl fmt::Display for ProductLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a decoded certificate.
///
/// A certificate carrying both server and client auth is labelled
/// `EndEntity`, the same as one carrying neither.
// TODO: give dual-usage certificates their own label once a matching
// template mapping exists on the host side.
#[must_use]
pub fn classify(cert: &X509Certificate<'_>) -> ProductLabel {
    let usage = match cert.extended_key_usage() {
        Ok(Some(ext)) => ext.value,
        _ => return ProductLabel::Unknown,
    };

    match (usage.server_auth, usage.client_auth) {
        (true, false) => ProductLabel::EndEntityServerAuth,
        (false, true) => ProductLabel::EndEntityClientAuth,
        _ => ProductLabel::EndEntity,
    }
}

/// What the connector needs from an issued certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetails {
    /// Base64 DER body, without PEM armour.
    pub body: String,
    /// Inferred product.
    pub product: ProductLabel,
    /// `notBefore`, in UTC.
    pub not_before: DateTime<Utc>,
}

/// Decode a PEM certificate and extract its body, product and `notBefore`.
pub fn inspect_certificate(certificate_pem: &str) -> ConnectorResult<CertificateDetails> {
    let pem_data = ::pem::parse(certificate_pem)
        .map_err(|e| ConnectorError::invalid_data(format!("Failed to parse PEM: {e}")))?;
    let der = pem_data.contents();

    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| ConnectorError::invalid_data(format!("Failed to parse X.509: {e:?}")))?;

    let timestamp = cert.validity().not_before.timestamp();
    let not_before = DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
        ConnectorError::invalid_data(format!("notBefore out of range: {timestamp}"))
    })?;

    Ok(CertificateDetails {
        body: base64::engine::general_purpose::STANDARD.encode(der),
        product: classify(&cert),
        not_before,
    })
}
