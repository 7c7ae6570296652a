//! TLSA Record Types
//!
//! Records as the reconciler sees them, plus the write operations it emits.

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Certificate usage 3: domain-issued certificate (DANE-EE)
pub const TLSA_USAGE: u8 = 3;
/// Selector 1: SubjectPublicKeyInfo
pub const TLSA_SELECTOR: u8 = 1;
/// Matching type 1: SHA-256
pub const TLSA_MATCHING_TYPE: u8 = 1;

/// The `data` object of a TLSA record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsaData {
    pub usage: u8,
    pub selector: u8,
    pub matching_type: u8,
    pub certificate: String,
}

impl TlsaData {
    /// `3 1 1` association for the given fingerprint
    pub fn for_fingerprint(fingerprint: &Fingerprint) -> Self {
        Self {
            usage: TLSA_USAGE,
            selector: TLSA_SELECTOR,
            matching_type: TLSA_MATCHING_TYPE,
            certificate: fingerprint.to_string(),
        }
    }
}

/// A TLSA record held by the DNS provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsaRecord {
    pub id: String,
    pub certificate: String,
}

impl TlsaRecord {
    pub fn new(id: impl Into<String>, certificate: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            certificate: certificate.into(),
        }
    }
}

/// A single write against the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Delete { id: String },
    Create { certificate: Fingerprint },
    Update { id: String, certificate: Fingerprint },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Delete { id } => write!(f, "delete {}", id),
            Operation::Create { certificate } => write!(f, "create {}", certificate),
            Operation::Update { id, certificate } => write!(f, "update {} -> {}", id, certificate),
        }
    }
}

/// Outcome of a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Operations in the order they were issued (or planned, for a dry run)
    pub operations: Vec<Operation>,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SyncReport {
    pub fn is_unchanged(&self) -> bool {
        self.operations.is_empty()
    }

    pub(crate) fn record(&mut self, op: Operation) {
        match op {
            Operation::Delete { .. } => self.deleted += 1,
            Operation::Create { .. } => self.created += 1,
            Operation::Update { .. } => self.updated += 1,
        }
        self.operations.push(op);
    }
}
