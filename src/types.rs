//! Core types for domain resolution
//!
//! `DomainRecord` is the canonical entity shared by the ledger adapter,
//! the mirror, the resolution cache and the HTTP API. It is serialized
//! with bincode in the mirror and as camelCase JSON on the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifier;

/// Placeholder address for records the ledger reports without one
pub const NO_ADDRESS: &str = "0.0.0.0";

// =============================================================================
// DOMAIN RECORD
// =============================================================================

/// A domain profile as mirrored from the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    /// Lowercased domain name (identity key)
    pub name: String,

    /// HASH160 of the name, the ledger lookup key
    pub identifier: String,

    /// Resolved network address
    pub address: String,

    pub owner: Option<String>,
    pub signer: Option<String>,

    /// Opaque application payload, stored verbatim
    pub metadata: Option<String>,

    /// Ledger reputation score
    pub rps: Option<u64>,

    // === Lease ===
    pub is_rented: bool,
    pub tenant: Option<String>,
    pub rented_at: Option<u64>,
    pub duration: Option<u64>,

    // === Status ===
    pub is_banned: bool,
    pub is_candidate: bool,
    pub is_domain: bool,

    // === Economics ===
    pub missed: Option<u64>,
    pub offered_at: Option<u64>,
    pub bid_amount: Option<u64>,
    pub buyer: Option<String>,
    pub balance: Option<u64>,
    pub bid_target: Option<String>,

    /// Subdomains owned by this profile, in ledger order
    pub owned_subrecords: Vec<Subrecord>,

    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl DomainRecord {
    /// Create an empty record for a name.
    ///
    /// The identifier is always derived here; nothing else assigns it.
    pub fn new(name: &str) -> Self {
        let name = identifier::normalize_name(name);
        let identifier = identifier::derive(&name);

        Self {
            name,
            identifier,
            address: NO_ADDRESS.to_string(),
            owner: None,
            signer: None,
            metadata: None,
            rps: None,
            is_rented: false,
            tenant: None,
            rented_at: None,
            duration: None,
            is_banned: false,
            is_candidate: false,
            is_domain: true,
            missed: None,
            offered_at: None,
            bid_amount: None,
            buyer: None,
            balance: None,
            bid_target: None,
            owned_subrecords: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Set the address, falling back to the placeholder for empty values
    pub fn set_address(&mut self, address: Option<&str>) {
        self.address = match address.map(str::trim) {
            Some(addr) if !addr.is_empty() => addr.to_string(),
            _ => NO_ADDRESS.to_string(),
        };
    }

    /// Whether the record has a real address
    pub fn has_address(&self) -> bool {
        self.address != NO_ADDRESS
    }

    /// Whether this record may be surfaced as a resolution
    pub fn is_resolvable(&self) -> bool {
        self.is_domain
    }

    /// Mark the record as mutated now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A subdomain owned by a domain profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subrecord {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub metadata: Option<String>,
    pub owner: Option<String>,
    pub rps: Option<u64>,
    pub ownership_type: Option<String>,
    pub tenant: Option<String>,
    pub rented_at: Option<u64>,
    pub duration: Option<u64>,
    pub is_candidate: bool,
    pub is_banned: bool,
    pub is_domain: bool,
    pub offered_at: Option<u64>,
    pub bid_amount: Option<u64>,
    pub buyer: Option<String>,
    pub balance: Option<u64>,
    pub bid_target: Option<String>,
}
