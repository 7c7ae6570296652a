//! TLSA Reconciler
//!
//! Converges the provider onto exactly two records whose certificates are
//! `{current, next}`, in either order.
//!
//! ## Decision table
//!
//! With anything other than two records, everything is deleted and both
//! records are recreated (`next` first). With two records, the first
//! matching row wins:
//!
//! | slot 0    | slot 1     | operations                         |
//! |-----------|------------|------------------------------------|
//! | current   | next       | none                               |
//! | next      | current    | none                               |
//! | current   | != next    | update slot 1 to next              |
//! | next      | != current | update slot 1 to current           |
//! | != next   | current    | update slot 0 to next              |
//! | != current| next       | update slot 0 to current           |
//! | other     | other      | update slot 1 to next, slot 0 to current |
//!
//! There is no locking: two runs against the same name can interleave.

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::provider::TlsaProvider;
use crate::types::{Operation, SyncReport, TlsaRecord};
use tracing::{debug, info};

/// Compute the operations that turn `existing` into the desired pair
pub fn reconcile(
    current: &Fingerprint,
    next: &Fingerprint,
    existing: &[TlsaRecord],
) -> Vec<Operation> {
    let [first, second] = existing else {
        return recreate(current, next, existing);
    };

    let (cert0, id0) = (first.certificate.as_str(), &first.id);
    let (cert1, id1) = (second.certificate.as_str(), &second.id);

    let update = |id: &String, certificate: &Fingerprint| Operation::Update {
        id: id.clone(),
        certificate: certificate.clone(),
    };

    if (current == cert0 && next == cert1) || (next == cert0 && current == cert1) {
        vec![]
    } else if current == cert0 {
        vec![update(id1, next)]
    } else if next == cert0 {
        vec![update(id1, current)]
    } else if current == cert1 {
        vec![update(id0, next)]
    } else if next == cert1 {
        vec![update(id0, current)]
    } else {
        vec![update(id1, next), update(id0, current)]
    }
}

fn recreate(current: &Fingerprint, next: &Fingerprint, existing: &[TlsaRecord]) -> Vec<Operation> {
    existing
        .iter()
        .map(|record| Operation::Delete {
            id: record.id.clone(),
        })
        .chain([
            Operation::Create {
                certificate: next.clone(),
            },
            Operation::Create {
                certificate: current.clone(),
            },
        ])
        .collect()
}

/// Drives a provider through list, plan and apply
pub struct Reconciler<P> {
    provider: P,
}

impl<P: TlsaProvider> Reconciler<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    #[cfg(test)]
    pub(crate) fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch provider state and compute the operations without issuing them
    pub async fn plan(&self, current: &Fingerprint, next: &Fingerprint) -> Result<Vec<Operation>> {
        let existing = self.provider.list().await?;

        info!(
            name = %self.provider.record_name(),
            count = existing.len(),
            "Fetched existing TLSA records"
        );
        for record in &existing {
            debug!(id = %record.id, certificate = %record.certificate, "Existing TLSA record");
        }

        Ok(reconcile(current, next, &existing))
    }

    /// Plan and apply. Stops at the first failed operation.
    pub async fn sync(&self, current: &Fingerprint, next: &Fingerprint) -> Result<SyncReport> {
        let operations = self.plan(current, next).await?;
        let mut report = SyncReport::default();

        if operations.is_empty() {
            info!(name = %self.provider.record_name(), "TLSA records already up to date");
            return Ok(report);
        }

        for op in operations {
            self.apply(&op).await?;
            report.record(op);
        }

        Ok(report)
    }

    async fn apply(&self, op: &Operation) -> Result<()> {
        match op {
            Operation::Delete { id } => {
                self.provider.delete(id).await?;
                info!(id = %id, "Deleted TLSA record");
            }
            Operation::Create { certificate } => {
                let record = self.provider.create(certificate).await?;
                info!(id = %record.id, certificate = %certificate, "Created TLSA record");
            }
            Operation::Update { id, certificate } => {
                self.provider.update(id, certificate).await?;
                info!(id = %id, certificate = %certificate, "Updated TLSA record");
            }
        }
        Ok(())
    }
}
