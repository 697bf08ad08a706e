//! Domain Mirror Module
//!
//! Durable local copy of ledger-derived domain records, stored in RocksDB
//! so it survives restarts. Records are keyed by name with a secondary
//! identifier index; both are unique.

mod storage;

pub use storage::DomainMirror;

use crate::types::DomainRecord;

/// Storage contract the resolver and reconciliation rely on
pub trait Mirror: Send + Sync {
    /// Find a record by (case-insensitive) name
    fn find_by_name(&self, name: &str) -> Result<Option<DomainRecord>, MirrorError>;

    /// Find a record by ledger identifier
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<DomainRecord>, MirrorError>;

    /// Create a record; fails with `Conflict` if the name or identifier is taken
    fn insert(&self, record: &DomainRecord) -> Result<(), MirrorError>;

    /// Create or overwrite a record by name
    fn upsert(&self, record: &DomainRecord) -> Result<(), MirrorError>;

    /// Load every mirrored record
    fn scan(&self) -> Result<Vec<DomainRecord>, MirrorError>;

    /// Number of mirrored records
    fn count(&self) -> Result<usize, MirrorError>;

    /// Flush pending writes to disk
    fn flush(&self) -> Result<(), MirrorError>;
}

/// Mirror persistence errors
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("failed to open mirror: {0}")]
    OpenFailed(String),

    #[error("mirror read failed: {0}")]
    ReadFailed(String),

    #[error("mirror write failed: {0}")]
    WriteFailed(String),

    #[error("corrupt mirror record: {0}")]
    Codec(String),

    #[error("uniqueness conflict on {0}")]
    Conflict(String),
}
