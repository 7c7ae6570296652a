//! TLSA Sync Library
//!
//! Keeps the DANE TLSA records of a service in Cloudflare DNS pointed at
//! the current and next certificate keys.

pub mod cloudflare;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod provider;
pub mod reconciler;
pub mod types;

pub use cloudflare::CloudflareClient;
pub use config::Config;
pub use error::SyncError;
pub use fingerprint::{derive, Fingerprint, KeyAlgorithm};
pub use provider::TlsaProvider;
pub use reconciler::{reconcile, Reconciler};
pub use types::{Operation, SyncReport, TlsaRecord};
