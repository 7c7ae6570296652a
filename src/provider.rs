//! DNS Provider Abstraction
//!
//! The reconciler only needs four calls against one TLSA owner name.
//! Implementations must not retry; the first error ends the run.

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::types::TlsaRecord;
use async_trait::async_trait;

/// TLSA record storage bound to a single record name
#[async_trait]
pub trait TlsaProvider: Send + Sync {
    /// Record name every call operates on
    fn record_name(&self) -> &str;

    /// All TLSA records at the record name, in provider order
    async fn list(&self) -> Result<Vec<TlsaRecord>>;

    /// Create a `3 1 1` record for the fingerprint
    async fn create(&self, certificate: &Fingerprint) -> Result<TlsaRecord>;

    /// Point an existing record at a new fingerprint
    async fn update(&self, id: &str, certificate: &Fingerprint) -> Result<TlsaRecord>;

    async fn delete(&self, id: &str) -> Result<()>;
}
