//! # CA Gateway Connector Framework
//!
//! Core abstractions for connecting a certificate-lifecycle host to an
//! external certificate authority.
//!
//! The host drives every operation; a connector translates host requests into
//! calls against its CA and hands certificate records back:
//!
//! - [`CaConnector`](traits::CaConnector) - enroll, fetch, ping, revoke,
//!   synchronize and validate
//! - [`CertificateDataReader`](traits::CertificateDataReader) - read-only view
//!   of the host's certificate store, used during synchronization
//! - [`CertificateRecord`](record::CertificateRecord) - the unit exchanged
//!   with the host
//!
//! ## Example
//!
//! ```ignore
//! use cagateway_connector::prelude::*;
//! use futures::StreamExt;
//!
//! connector.ping().await?;
//!
//! let mut records = connector
//!     .synchronize(&host_store, false, CancellationToken::new())
//!     .await?;
//! while let Some(record) = records.next().await {
//!     host_store.save(record?).await;
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`error`] - Error taxonomy with transient/permanent classification
//! - [`record`] - Certificate records, dispositions and enrollment requests
//! - [`traits`] - Connector capability traits
//! - [`config`] - Connection info and configuration trait

pub mod config;
pub mod error;
pub mod record;
pub mod traits;

/// Prelude module for convenient imports.
///
/// ```
/// use cagateway_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{connection_field, ConnectionInfo, ConnectorConfig};
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::record::{
        CertificateRecord, EnrollmentProductInfo, EnrollmentRequest, EnrollmentType,
        RequestDisposition,
    };
    pub use crate::traits::{CaConnector, CertificateDataReader, RecordStream};

    pub use tokio_util::sync::CancellationToken;
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
