//! Ledger JSON-RPC wire types
//!
//! `getprofile` returns camelCase profile objects; `getdomainprofiles`
//! returns snake_case listing entries. Both are translated into the
//! internal `DomainRecord` shape here.

use serde::{Deserialize, Serialize};

use crate::identifier;
use crate::types::{DomainRecord, Subrecord};

/// RPC method for single-profile lookup by identifier
pub const METHOD_GET_PROFILE: &str = "getprofile";

/// RPC method for the full domain listing
pub const METHOD_GET_DOMAIN_PROFILES: &str = "getdomainprofiles";

/// JSON-RPC request envelope (v1.0, as spoken by the ledger node)
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: &'static str,
    pub method: &'a str,
    pub params: serde_json::Value,
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// getprofile
// =============================================================================

/// Profile object returned by `getprofile`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileResponse {
    pub name: Option<String>,
    pub profile_id: Option<String>,
    pub link: Option<String>,
    pub owner: Option<String>,
    pub signer: Option<String>,
    pub app_data: Option<serde_json::Value>,
    pub rps: Option<u64>,
    pub is_rented: Option<bool>,
    pub tenant: Option<String>,
    pub rented_at: Option<u64>,
    pub duration: Option<u64>,
    pub is_candidate: Option<bool>,
    pub is_banned: Option<bool>,
    pub missed: Option<u64>,
    pub is_domain: Option<bool>,
    pub offered_at: Option<u64>,
    pub bid_amount: Option<u64>,
    pub buyer: Option<String>,
    pub balance: Option<u64>,
    pub bid_target: Option<String>,
    pub owned_profiles: Option<Vec<OwnedProfileResponse>>,
}

/// Subdomain entry inside a profile
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OwnedProfileResponse {
    pub id: String,
    pub name: String,
    pub link: Option<String>,
    pub app_data: Option<serde_json::Value>,
    pub owner: Option<String>,
    pub rps: Option<u64>,
    pub ownership_type: Option<String>,
    pub tenant: Option<String>,
    pub rented_at: Option<u64>,
    pub duration: Option<u64>,
    pub is_candidate: Option<bool>,
    pub is_banned: Option<bool>,
    pub is_domain: Option<bool>,
    pub offered_at: Option<u64>,
    pub bid_amount: Option<u64>,
    pub buyer: Option<String>,
    pub balance: Option<u64>,
    pub bid_target: Option<String>,
}

impl ProfileResponse {
    /// Whether the ledger flags this profile as a domain
    pub fn is_domain(&self) -> bool {
        self.is_domain == Some(true)
    }

    /// Translate into a record for the looked-up name.
    ///
    /// The name we queried with is authoritative; the identifier is
    /// re-derived from it rather than taken from `profileId`.
    pub fn into_record(self, name: &str) -> DomainRecord {
        let mut record = DomainRecord::new(name);
        record.set_address(self.link.as_deref());
        record.owner = self.owner;
        record.signer = self.signer;
        record.metadata = self.app_data.map(metadata_text);
        record.rps = self.rps;
        record.is_rented = self.is_rented.unwrap_or(false);
        record.tenant = self.tenant;
        record.rented_at = self.rented_at;
        record.duration = self.duration;
        record.is_candidate = self.is_candidate.unwrap_or(false);
        record.is_banned = self.is_banned.unwrap_or(false);
        record.is_domain = self.is_domain.unwrap_or(false);
        record.missed = self.missed;
        record.offered_at = self.offered_at;
        record.bid_amount = self.bid_amount;
        record.buyer = self.buyer;
        record.balance = self.balance;
        record.bid_target = self.bid_target;
        record.owned_subrecords = self
            .owned_profiles
            .unwrap_or_default()
            .into_iter()
            .map(OwnedProfileResponse::into_subrecord)
            .collect();
        record
    }
}

impl OwnedProfileResponse {
    fn into_subrecord(self) -> Subrecord {
        Subrecord {
            id: self.id,
            name: self.name,
            address: self.link,
            metadata: self.app_data.map(metadata_text),
            owner: self.owner,
            rps: self.rps,
            ownership_type: self.ownership_type,
            tenant: self.tenant,
            rented_at: self.rented_at,
            duration: self.duration,
            is_candidate: self.is_candidate.unwrap_or(false),
            is_banned: self.is_banned.unwrap_or(false),
            is_domain: self.is_domain.unwrap_or(false),
            offered_at: self.offered_at,
            bid_amount: self.bid_amount,
            buyer: self.buyer,
            balance: self.balance,
            bid_target: self.bid_target,
        }
    }
}

/// Store app data verbatim: strings as-is, anything else as compact JSON
fn metadata_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

// =============================================================================
// getdomainprofiles
// =============================================================================

/// Result of `getdomainprofiles`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainProfilesResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub domains: Vec<DomainProfileEntry>,
}

/// One entry of the domain listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DomainProfileEntry {
    pub profile_id: String,
    pub name: String,
    pub ip: Option<String>,
    pub rps: Option<serde_json::Value>,
    pub height: Option<serde_json::Value>,
    pub extra: Option<serde_json::Value>,
    pub owner: Option<String>,
}

/// Full ledger snapshot used by reconciliation
#[derive(Debug, Clone, Default)]
pub struct LedgerListing {
    /// Total reported by the ledger
    pub total: u64,

    /// Listed domains, in ledger order
    pub domains: Vec<ListedDomain>,
}

/// Internal view of a listing entry.
///
/// The listing carries only a subset of profile fields, so it is applied
/// as an overlay onto an existing (or fresh) record instead of replacing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedDomain {
    pub name: String,
    pub profile_id: String,
    pub address: Option<String>,
    pub owner: Option<String>,
    pub rps: Option<u64>,
    pub metadata: String,
}

impl ListedDomain {
    /// The identifier this entry resolves to locally
    pub fn identifier(&self) -> String {
        identifier::derive(&self.name)
    }

    /// Whether the ledger-supplied profile id agrees with the derived one
    pub fn profile_id_matches(&self) -> bool {
        self.profile_id.trim_start_matches("0x").eq_ignore_ascii_case(&self.identifier())
    }

    /// Apply the listed fields onto a base record
    pub fn overlay(&self, mut base: DomainRecord) -> DomainRecord {
        base.set_address(self.address.as_deref());
        base.owner = self.owner.clone();
        base.metadata = Some(self.metadata.clone());
        base.rps = self.rps;
        base.is_banned = false;
        base.is_domain = true;
        base
    }
}

impl From<DomainProfileEntry> for ListedDomain {
    fn from(entry: DomainProfileEntry) -> Self {
        // Key order of serde_json's default map is sorted, so this is canonical
        let metadata = serde_json::json!({
            "rps": entry.rps,
            "height": entry.height,
            "extra": entry.extra,
        })
        .to_string();

        Self {
            name: identifier::normalize_name(&entry.name),
            profile_id: entry.profile_id,
            address: entry.ip,
            owner: entry.owner,
            rps: entry.rps.as_ref().and_then(serde_json::Value::as_u64),
            metadata,
        }
    }
}

impl From<DomainProfilesResponse> for LedgerListing {
    fn from(response: DomainProfilesResponse) -> Self {
        Self {
            total: response.total,
            domains: response.domains.into_iter().map(ListedDomain::from).collect(),
        }
    }
}
