//! Audit-driven synchronization.
//!
//! Walks the CA's audit inventory and emits a record for every certificate
//! whose state on the host is missing or out of date. Certificates the host
//! already reflects are skipped without being downloaded, unless a full sync
//! is requested.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cagateway_connector::error::{ConnectorError, ConnectorResult};
use cagateway_connector::record::CertificateRecord;
use cagateway_connector::traits::{CertificateDataReader, RecordStream};

use crate::audit::AuditRecord;
use crate::revocation::{self, UNSPECIFIED_CODE};

/// Source of authoritative certificate bodies.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Fetch and classify one certificate. Fails with `Cancelled` if
    /// `cancel` fires while waiting on the CA.
    async fn fetch_full(
        &self,
        certificate_arn: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<CertificateRecord>;
}

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default)]
struct PassStats {
    examined: usize,
    skipped: usize,
    duplicates: usize,
    emitted: usize,
}

/// One reconciliation pass over an audit inventory.
pub struct SyncReconciler<'a> {
    reader: &'a dyn CertificateDataReader,
    source: &'a dyn CertificateSource,
    full_sync: bool,
    cancel: CancellationToken,
}

impl<'a> SyncReconciler<'a> {
    pub fn new(
        reader: &'a dyn CertificateDataReader,
        source: &'a dyn CertificateSource,
        full_sync: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            reader,
            source,
            full_sync,
            cancel,
        }
    }

    /// Lazily reconcile `inventory` against the host store.
    ///
    /// Yields at most one record per certificate ARN. A fetch failure is
    /// yielded once and ends the stream; cancellation ends it silently.
    pub fn reconcile(self, inventory: Vec<AuditRecord>) -> RecordStream<'a> {
        let pass = Pass {
            reconciler: self,
            pending: inventory.into_iter(),
            seen: HashSet::new(),
            stats: PassStats::default(),
            done: false,
        };

        stream::unfold(pass, |mut pass| async move {
            if pass.done {
                return None;
            }
            let item = pass.next_record().await?;
            Some((item, pass))
        })
        .boxed()
    }
}

struct Pass<'a> {
    reconciler: SyncReconciler<'a>,
    pending: std::vec::IntoIter<AuditRecord>,
    seen: HashSet<String>,
    stats: PassStats,
    done: bool,
}

impl Pass<'_> {
    async fn next_record(&mut self) -> Option<ConnectorResult<CertificateRecord>> {
        let reader = self.reconciler.reader;
        let source = self.reconciler.source;
        let full_sync = self.reconciler.full_sync;
        let cancel = self.reconciler.cancel.clone();

        for audit in self.pending.by_ref() {
            if cancel.is_cancelled() {
                self.finish("cancelled");
                return None;
            }

            if !self.seen.insert(audit.certificate_arn.clone()) {
                debug!(certificate_arn = %audit.certificate_arn, "Duplicate inventory entry ignored");
                self.stats.duplicates += 1;
                continue;
            }
            self.stats.examined += 1;

            let derived = audit.disposition();
            if !full_sync {
                if let Some(local) = reader.certificate_record(&audit.certificate_arn).await {
                    if local.status == derived.code() {
                        debug!(certificate_arn = %audit.certificate_arn, "Certificate up to date");
                        self.stats.skipped += 1;
                        continue;
                    }
                }
            }

            match source.fetch_full(&audit.certificate_arn, &cancel).await {
                Ok(fetched) => {
                    self.stats.emitted += 1;
                    return Some(Ok(merge(&audit, fetched)));
                }
                Err(ConnectorError::Cancelled) => {
                    self.finish("cancelled");
                    return None;
                }
                Err(e) => {
                    warn!(
                        certificate_arn = %audit.certificate_arn,
                        error = %e,
                        "Failed to fetch certificate during sync"
                    );
                    self.finish("failed");
                    return Some(Err(e));
                }
            }
        }

        self.finish("completed");
        None
    }

    fn finish(&mut self, outcome: &str) {
        self.done = true;
        info!(
            outcome,
            full_sync = self.reconciler.full_sync,
            examined = self.stats.examined,
            skipped = self.stats.skipped,
            duplicates = self.stats.duplicates,
            emitted = self.stats.emitted,
            "Synchronization pass finished"
        );
    }
}

/// Combine an audit row with the fetched certificate.
///
/// Identity and revocation come from the audit row; body, product and
/// submission date from the CA.
fn merge(audit: &AuditRecord, fetched: CertificateRecord) -> CertificateRecord {
    let record = CertificateRecord::issued(
        audit.certificate_arn.clone(),
        fetched.certificate_pem,
        fetched.product_id,
        fetched.submission_date,
    );

    match audit.revocation_date {
        Some(revoked_at) => {
            let reason_code = audit
                .revocation_reason
                .as_deref()
                .map(revocation::from_native)
                .unwrap_or(UNSPECIFIED_CODE);
            record.revoked(revoked_at, reason_code)
        }
        None => record,
    }
}
