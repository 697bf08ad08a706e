//! Ledger Adapter Module
//!
//! Read-only access to the authoritative ledger node.
//!
//! - `lookup_by_name`: single-profile query (`getprofile`), non-domains filtered out
//! - `list_all`: full domain listing (`getdomainprofiles`), used by reconciliation
//!
//! Transport failures are reported as `LedgerError` and are kept distinct
//! from legitimate absence (`Ok(None)`).

pub mod fixtures;
pub mod protocol;
mod rpc;

pub use fixtures::FixtureLedger;
pub use protocol::{LedgerListing, ListedDomain};
pub use rpc::RpcLedger;

use async_trait::async_trait;

use crate::types::DomainRecord;

/// Query contract against the authoritative ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Look up a domain by name.
    ///
    /// Returns `Ok(None)` when the ledger has no profile for the name or
    /// the profile is not flagged as a domain.
    async fn lookup_by_name(&self, name: &str) -> Result<Option<DomainRecord>, LedgerError>;

    /// Fetch the full domain listing as an authoritative snapshot
    async fn list_all(&self) -> Result<LedgerListing, LedgerError>;
}

/// Ledger transport errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Transport(String),

    #[error("ledger request timed out after {0}s")]
    Timeout(u64),

    #[error("ledger HTTP error: {0}")]
    Http(u16),

    #[error("ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed ledger response: {0}")]
    Malformed(String),
}
