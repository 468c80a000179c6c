//! Connector Framework traits
//!
//! The contract a CA connector presents to the host, and the read-only view
//! of the host's certificate store a connector consumes.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::config::ConnectionInfo;
use crate::error::ConnectorResult;
use crate::record::{
    CertificateRecord, EnrollmentProductInfo, EnrollmentRequest, RequestDisposition,
};

/// Lazy sequence of records produced by a synchronization pass.
///
/// An `Err` item ends the pass; no further items follow it.
pub type RecordStream<'a> = BoxStream<'a, ConnectorResult<CertificateRecord>>;

/// Read-only access to the host's certificate store.
#[async_trait]
pub trait CertificateDataReader: Send + Sync {
    /// Look up the locally stored record for a CA request id.
    ///
    /// Returns `None` if the host has never seen the certificate.
    async fn certificate_record(&self, ca_request_id: &str) -> Option<CertificateRecord>;
}

/// Base trait for certificate authority connectors.
#[async_trait]
pub trait CaConnector: Send + Sync {
    /// Get the display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Enroll for a certificate and return the issued record.
    async fn enroll(&self, request: &EnrollmentRequest) -> ConnectorResult<CertificateRecord>;

    /// Fetch a single certificate record by its CA request id.
    async fn get_single_record(&self, ca_request_id: &str) -> ConnectorResult<CertificateRecord>;

    /// Verify the CA is reachable and able to issue.
    async fn ping(&self) -> ConnectorResult<()>;

    /// Revoke a certificate.
    ///
    /// # Arguments
    /// * `ca_request_id` - The CA request id of the certificate
    /// * `hex_serial` - The certificate serial, hex-encoded
    /// * `reason_code` - Host revocation reason code
    async fn revoke(
        &self,
        ca_request_id: &str,
        hex_serial: &str,
        reason_code: u32,
    ) -> ConnectorResult<RequestDisposition>;

    /// Synchronize the host with the CA's inventory.
    ///
    /// Fetching the inventory is all-or-nothing: an error is returned before
    /// any record is produced. The returned stream yields only records the
    /// host needs to update (every record when `full_sync` is set) and stops
    /// once `cancel` fires.
    async fn synchronize<'a>(
        &'a self,
        reader: &'a dyn CertificateDataReader,
        full_sync: bool,
        cancel: CancellationToken,
    ) -> ConnectorResult<RecordStream<'a>>;

    /// Validate connection info before the host saves it.
    ///
    /// Every check runs; failures are collected into
    /// [`ConnectorError::ValidationFailed`](crate::error::ConnectorError::ValidationFailed).
    async fn validate_connection_info(&self, info: &ConnectionInfo) -> ConnectorResult<()>;

    /// Validate that a product can be enrolled for.
    async fn validate_product_info(&self, product: &EnrollmentProductInfo) -> ConnectorResult<()>;
}
